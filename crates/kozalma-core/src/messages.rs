//! Spoken phrases in every supported language.
//!
//! Every user-facing outcome, including every failure path, maps to a
//! `Phrase` so that the user always hears something in the active language.

use serde::{Deserialize, Serialize};

/// Interface and speech language. The wire codes match the backend's `lang` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ru,
    Kz,
}

impl Language {
    /// Code sent to the backend (`ru` | `kz`)
    pub fn code(&self) -> &'static str {
        match self {
            Language::Ru => "ru",
            Language::Kz => "kz",
        }
    }

    /// BCP 47 locale handed to the speech engine.
    /// Kazakh uses the ISO 639-1 code `kk`, not the backend's `kz`.
    pub fn locale(&self) -> &'static str {
        match self {
            Language::Ru => "ru-RU",
            Language::Kz => "kk-KZ",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "ru" => Some(Language::Ru),
            "kz" | "kk" => Some(Language::Kz),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phrase {
    // Volume zones
    VolumeHintLeft,
    VolumeHintRight,
    VolumeUp,
    VolumeDown,
    VolumeMax,
    VolumeMin,

    // Scanning
    ScanButton,
    ScanButtonHint,
    Scanning,
    NothingRecognized,
    CameraUnavailable,
    ScanFailed,

    // Connectivity and session
    NetworkError,
    ServiceUnavailable,
    SessionExpired,

    // Login
    InvalidIdentifier,
    InvalidCodeFormat,
    InvalidCode,
    ResendAvailable,
    LoggedIn,
    LoggedOut,

    // Flashlight
    FlashlightOn,
    FlashlightOff,
    FlashlightUnavailable,
}

impl Phrase {
    pub fn text(self, language: Language) -> &'static str {
        match language {
            Language::Ru => self.ru(),
            Language::Kz => self.kz(),
        }
    }

    fn ru(self) -> &'static str {
        match self {
            Phrase::VolumeHintLeft => "Левый край: дважды коснитесь, чтобы уменьшить громкость",
            Phrase::VolumeHintRight => "Правый край: дважды коснитесь, чтобы увеличить громкость",
            Phrase::VolumeUp => "Громкость увеличена",
            Phrase::VolumeDown => "Громкость уменьшена",
            Phrase::VolumeMax => "Максимальная громкость",
            Phrase::VolumeMin => "Минимальная громкость",
            Phrase::ScanButton => "Сканировать",
            Phrase::ScanButtonHint => "Дважды коснитесь, чтобы описать то, что перед камерой",
            Phrase::Scanning => "Сканирую",
            Phrase::NothingRecognized => "Ничего не распознано",
            Phrase::CameraUnavailable => "Камера недоступна",
            Phrase::ScanFailed => "Не удалось распознать изображение",
            Phrase::NetworkError => "Нет соединения с сервером",
            Phrase::ServiceUnavailable => "Сервис временно недоступен",
            Phrase::SessionExpired => "Сессия истекла. Войдите снова",
            Phrase::InvalidIdentifier => "Проверьте адрес почты или номер телефона",
            Phrase::InvalidCodeFormat => "Код должен состоять из шести цифр",
            Phrase::InvalidCode => "Неверный или просроченный код",
            Phrase::ResendAvailable => "Можно запросить код повторно",
            Phrase::LoggedIn => "Вход выполнен",
            Phrase::LoggedOut => "Вы вышли из аккаунта",
            Phrase::FlashlightOn => "Фонарик включён",
            Phrase::FlashlightOff => "Фонарик выключен",
            Phrase::FlashlightUnavailable => "Фонарик недоступен",
        }
    }

    fn kz(self) -> &'static str {
        match self {
            Phrase::VolumeHintLeft => "Сол жақ шеті: дыбысты азайту үшін екі рет түртіңіз",
            Phrase::VolumeHintRight => "Оң жақ шеті: дыбысты арттыру үшін екі рет түртіңіз",
            Phrase::VolumeUp => "Дыбыс қаттырақ",
            Phrase::VolumeDown => "Дыбыс ақырынырақ",
            Phrase::VolumeMax => "Ең жоғары дыбыс",
            Phrase::VolumeMin => "Ең төменгі дыбыс",
            Phrase::ScanButton => "Сканерлеу",
            Phrase::ScanButtonHint => "Камера алдындағыны сипаттау үшін екі рет түртіңіз",
            Phrase::Scanning => "Сканерлеп жатырмын",
            Phrase::NothingRecognized => "Ештеңе танылмады",
            Phrase::CameraUnavailable => "Камера қолжетімсіз",
            Phrase::ScanFailed => "Суретті тану мүмкін болмады",
            Phrase::NetworkError => "Сервермен байланыс жоқ",
            Phrase::ServiceUnavailable => "Қызмет уақытша қолжетімсіз",
            Phrase::SessionExpired => "Сессия аяқталды. Қайта кіріңіз",
            Phrase::InvalidIdentifier => "Пошта мекенжайын немесе телефон нөмірін тексеріңіз",
            Phrase::InvalidCodeFormat => "Код алты цифрдан тұруы керек",
            Phrase::InvalidCode => "Код қате немесе мерзімі өткен",
            Phrase::ResendAvailable => "Кодты қайта сұрауға болады",
            Phrase::LoggedIn => "Кіру орындалды",
            Phrase::LoggedOut => "Сіз аккаунттан шықтыңыз",
            Phrase::FlashlightOn => "Қалта шам қосылды",
            Phrase::FlashlightOff => "Қалта шам өшірілді",
            Phrase::FlashlightUnavailable => "Қалта шам қолжетімсіз",
        }
    }
}

/// Announcement after a code was sent, naming the resend cooldown.
pub fn code_sent(language: Language, cooldown_seconds: u32) -> String {
    match language {
        Language::Ru => format!(
            "Код отправлен. Повторный запрос через {} секунд",
            cooldown_seconds
        ),
        Language::Kz => format!(
            "Код жіберілді. Қайта сұрау {} секундтан кейін",
            cooldown_seconds
        ),
    }
}
