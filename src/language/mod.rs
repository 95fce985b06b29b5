//! Language detection for incoming chat messages.
//!
//! Two stages: keyword tables catch short Latin-script messages where
//! statistical detection is unreliable, then Unicode script ranges settle
//! the non-Latin alphabets. A per-session hint breaks ties.

const SPANISH_KEYWORDS: &[&str] = &[
    "hola",
    "gracias",
    "buenos días",
    "buenas tardes",
    "buenas noches",
    "ayuda",
    "vuelos",
    "vuelo",
    "equipaje",
    "buscar",
    "cuánto",
    "cuándo",
    "dónde",
    "quiero",
    "necesito",
    "puedo",
    "tengo",
    "cómo",
    "qué",
    "por favor",
    "aeropuerto",
    "avión",
    "pasaje",
    "reserva",
    "cancelar",
    "maleta",
    "dame",
    "dime",
    "mañana",
    "hoy",
    "ayer",
    "viajar",
];

const ENGLISH_KEYWORDS: &[&str] = &[
    "hello", "hi", "hey", "thanks", "thank you", "help", "please", "flights", "baggage",
    "luggage", "book", "cancel", "airport", "how", "what", "where", "when", "can", "want",
    "need", "find", "tomorrow", "today", "search", "show", "get",
];

const PORTUGUESE_KEYWORDS: &[&str] = &[
    "olá",
    "obrigado",
    "obrigada",
    "ajuda",
    "voos",
    "bagagem",
    "aeroporto",
    "quando",
    "onde",
    "quero",
    "preciso",
    "amanhã",
    "hoje",
    "procurar",
    "reservar",
];

const FRENCH_KEYWORDS: &[&str] = &[
    "bonjour", "merci", "aide", "vols", "bagages", "aéroport", "quand", "où", "comment",
    "voulez", "besoin", "chercher",
];

const HINDI_KEYWORDS: &[&str] = &[
    "नमस्ते", "धन्यवाद", "मदद", "कृपया", "उड़ान", "सामान", "हवाई", "कब", "कहाँ", "कैसे", "क्या",
    "चाहिए", "बुक", "रद्द",
];

const SHORT_TEXT_LIMIT: usize = 15;

/// Detect the ISO 639-1 language code of `text`.
///
/// Falls back to the session hint, then to `default`.
pub fn detect_language(text: &str, default: &str, session_hint: Option<&str>) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return session_hint.unwrap_or(default).to_string();
    }

    if let Some(script_lang) = detect_by_script(trimmed) {
        return script_lang.to_string();
    }

    let lowered = trimmed.to_lowercase();

    if lowered.chars().count() < SHORT_TEXT_LIMIT {
        if let Some(lang) = detect_by_keywords(&lowered) {
            return lang.to_string();
        }
        if let Some(hint) = session_hint {
            return hint.to_string();
        }
    }

    if let Some(lang) = detect_by_keywords(&lowered) {
        return lang.to_string();
    }

    session_hint.unwrap_or(default).to_string()
}

fn detect_by_keywords(lowered: &str) -> Option<&'static str> {
    // Spanish before Portuguese: the two share vocabulary and es traffic
    // dominates.
    let tables: [(&str, &[&str]); 5] = [
        ("es", SPANISH_KEYWORDS),
        ("en", ENGLISH_KEYWORDS),
        ("hi", HINDI_KEYWORDS),
        ("pt", PORTUGUESE_KEYWORDS),
        ("fr", FRENCH_KEYWORDS),
    ];

    for (lang, keywords) in tables {
        if keywords.iter().any(|kw| contains_word(lowered, kw)) {
            return Some(lang);
        }
    }
    None
}

fn contains_word(text: &str, word: &str) -> bool {
    if word.contains(' ') {
        return text.contains(word);
    }
    text.split(|c: char| !c.is_alphanumeric())
        .any(|token| token == word)
}

fn detect_by_script(text: &str) -> Option<&'static str> {
    let mut saw_han = false;
    for c in text.chars() {
        match c {
            '\u{0900}'..='\u{097F}' => return Some("hi"),
            // kana settles Japanese even when kanji appear first
            '\u{3040}'..='\u{30FF}' => return Some("ja"),
            '\u{AC00}'..='\u{D7AF}' | '\u{1100}'..='\u{11FF}' => return Some("ko"),
            '\u{4E00}'..='\u{9FFF}' => saw_han = true,
            '\u{0600}'..='\u{06FF}' => return Some("ar"),
            '\u{0400}'..='\u{04FF}' => return Some("ru"),
            _ => continue,
        }
    }
    if saw_han {
        return Some("zh-cn");
    }
    None
}

pub fn language_name(code: &str) -> &'static str {
    match code {
        "en" => "English",
        "es" => "Spanish",
        "hi" => "Hindi",
        "fr" => "French",
        "de" => "German",
        "pt" => "Portuguese",
        "it" => "Italian",
        "ja" => "Japanese",
        "ko" => "Korean",
        "zh-cn" => "Chinese",
        "ar" => "Arabic",
        "ru" => "Russian",
        _ => "English",
    }
}

/// The instruction block injected into the system prompt so the model
/// answers in the detected language.
pub fn language_instruction(code: &str) -> String {
    let name = language_name(code);

    let disambiguation = match code {
        "es" => {
            "\n- **IMPORTANT**: User is speaking SPANISH (not Portuguese). Use Spanish vocabulary."
        }
        "pt" => {
            "\n- **IMPORTANT**: User is speaking PORTUGUESE (not Spanish). Use Portuguese vocabulary."
        }
        _ => "",
    };

    format!(
        "\n**DETECTED USER LANGUAGE: {} ({})**\n\n\
         **CRITICAL LANGUAGE INSTRUCTION:**\n\
         - The user is communicating in **{}**.\n\
         - You MUST respond ENTIRELY in **{}**.\n\
         - Do NOT switch to English unless the user explicitly asks.\n\
         - Maintain natural, professional {} throughout your entire response.{}\n",
        name.to_uppercase(),
        code,
        name,
        name,
        name,
        disambiguation
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_short_greetings_by_keyword() {
        assert_eq!(detect_language("hola", "en", None), "es");
        assert_eq!(detect_language("Hello!", "en", None), "en");
        assert_eq!(detect_language("bonjour", "en", None), "fr");
        assert_eq!(detect_language("olá", "en", None), "pt");
    }

    #[test]
    fn detects_scripts() {
        assert_eq!(detect_language("दिल्ली से मुंबई की फ्लाइट कब है?", "en", None), "hi");
        assert_eq!(detect_language("東京への便はありますか", "en", None), "ja");
        assert_eq!(detect_language("안녕하세요", "en", None), "ko");
        assert_eq!(detect_language("ما هو وزن الأمتعة المسموح به؟", "en", None), "ar");
        assert_eq!(detect_language("Сколько багажа разрешено?", "en", None), "ru");
    }

    #[test]
    fn session_hint_wins_for_unknown_short_text() {
        assert_eq!(detect_language("ok", "en", Some("es")), "es");
    }

    #[test]
    fn empty_text_falls_back() {
        assert_eq!(detect_language("   ", "en", None), "en");
        assert_eq!(detect_language("", "en", Some("hi")), "hi");
    }

    #[test]
    fn longer_sentences_match_keywords() {
        assert_eq!(
            detect_language("quiero buscar vuelos para mañana por favor", "en", None),
            "es"
        );
        assert_eq!(
            detect_language("what is the baggage allowance to London", "en", None),
            "en"
        );
    }

    #[test]
    fn spanish_disambiguation_is_included() {
        let instruction = language_instruction("es");
        assert!(instruction.contains("SPANISH (not Portuguese)"));
        assert!(instruction.contains("Spanish"));
    }
}
