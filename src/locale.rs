//! Operator-facing strings.  Only Japanese and English are carried.

use once_cell::sync::Lazy;
use regex::Regex;

static JA_RE: Lazy<Regex> = Lazy::new(|| Regex::new("ja").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    Ja,
    #[default]
    En,
}

impl Locale {
    /// Pick the locale from a language tag such as `ja-JP` or `en_US.UTF-8`.
    pub fn from_language(tag: &str) -> Self {
        if JA_RE.is_match(tag) {
            Locale::Ja
        } else {
            Locale::En
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Locale::Ja => "ja",
            Locale::En => "en",
        }
    }

    pub fn fetch_error_message(self) -> &'static str {
        match self {
            Locale::Ja => "[Zendesk事故防止ツール]\n\n設定ファイルが取得できませんでした。\n継続して発生する場合は開発者にお知らせ下さい。",
            Locale::En => "[Zendesk Incident Protector]\n\nCould not retrieve the configuration file.\nIf this keeps happening, please contact the developer.",
        }
    }

    pub fn config_url_prompt(self) -> &'static str {
        match self {
            Locale::Ja => "[Zendesk 事故防止ツール]\nNGワードの設定が記載されたURLを指定してください",
            Locale::En => "[Zendesk Incident Protector]\nPlease enter the URL of the NG word configuration",
        }
    }

    /// Confirmation shown before a guarded reply is sent: prefix, the reply
    /// text verbatim, suffix.
    pub fn confirm_text(self, reply: &str) -> String {
        let (prefix, suffix) = match self {
            Locale::Ja => (
                "[Zendesk事故防止ツール]\n\n以下の文章はNGワードを含んでいます。\n\n-----\n",
                "\n-----\n\n本当にパブリック返信で送信してもよろしいですか？",
            ),
            Locale::En => (
                "[Zendesk Incident Protector]\n\nThe following reply contains NG words.\n\n-----\n",
                "\n-----\n\nAre you sure you want to send it as a public reply?",
            ),
        };
        format!("{prefix}{reply}{suffix}")
    }
}
