/// Reading direction of a rendered block
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
}

impl TextDirection {
    /// Direction of `text`: right-to-left as soon as any Arabic or Arabic
    /// Supplement character appears anywhere in it
    pub fn detect(text: &str) -> Self {
        if text.chars().any(is_rtl_char) {
            TextDirection::Rtl
        } else {
            TextDirection::Ltr
        }
    }

    pub fn is_rtl(&self) -> bool {
        matches!(self, TextDirection::Rtl)
    }
}

fn is_rtl_char(c: char) -> bool {
    matches!(c, '\u{0600}'..='\u{06FF}' | '\u{0750}'..='\u{077F}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin_is_ltr() {
        assert_eq!(TextDirection::detect("Hello, world"), TextDirection::Ltr);
        assert_eq!(TextDirection::detect(""), TextDirection::Ltr);
    }

    #[test]
    fn test_arabic_is_rtl() {
        assert_eq!(TextDirection::detect("مرحبا"), TextDirection::Rtl);
        // A single Arabic character in mostly Latin text still flips the block
        assert!(TextDirection::detect("The word is سلام.").is_rtl());
    }

    #[test]
    fn test_arabic_supplement_range() {
        assert!(TextDirection::detect("\u{0750}").is_rtl());
        assert!(TextDirection::detect("\u{077F}").is_rtl());
        assert!(!TextDirection::detect("\u{0780}").is_rtl());
    }

    #[test]
    fn test_hebrew_is_not_detected() {
        assert_eq!(TextDirection::detect("שלום"), TextDirection::Ltr);
    }
}
