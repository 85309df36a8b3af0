use rowan::TextRange;

/// Diagnostic kinds, grouped by the pass that produces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    // Compatibility checking
    IncompatibleFamilies,
    IncompatibleTypes,
    FieldCountMismatch,
    OptionalityMismatch,
    DimensionMismatch,
    MissingAlternative,

    // Dense structure validation
    ValueListNotAllowed,
    TooManyElements,
    TooFewElements,
    NotUsedNotAllowed,
    OmitOnMandatoryField,

    // Sparse structure validation
    IndexedListNotAllowed,
    NonConstantIndex,
    NegativeIndex,
    IndexOverflow,
    IndexOutOfRange,
    DuplicateIndex,
    MissingIndex,
}

impl DiagnosticKind {
    /// Default severity for this kind. Can be overridden per diagnostic.
    pub fn default_severity(&self) -> Severity {
        Severity::Error
    }

    /// Default hint, automatically included in rendered output.
    pub fn default_hint(&self) -> Option<&'static str> {
        match self {
            Self::NotUsedNotAllowed => Some("`-` is allowed only where a base template fills the element in"),
            Self::MissingIndex => Some("constant definitions must populate every index of a fixed-size type"),
            Self::NonConstantIndex => Some("indices of constants must be known at compile time"),
            _ => None,
        }
    }

    /// Base message for this diagnostic kind, used when no detail is provided.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            // Compatibility
            Self::IncompatibleFamilies => "incompatible type families",
            Self::IncompatibleTypes => "type mismatch",
            Self::FieldCountMismatch => "field counts differ",
            Self::OptionalityMismatch => "optionality differs",
            Self::DimensionMismatch => "array dimensions differ",
            Self::MissingAlternative => "no matching alternative",

            // Dense structure
            Self::ValueListNotAllowed => "value list is not allowed here",
            Self::TooManyElements => "too many elements",
            Self::TooFewElements => "too few elements",
            Self::NotUsedNotAllowed => "the not-used symbol `-` is not allowed here",
            Self::OmitOnMandatoryField => "omit is allowed only for optional fields",

            // Sparse structure
            Self::IndexedListNotAllowed => "indexed assignment notation is not allowed here",
            Self::NonConstantIndex => "index must be a compile-time constant",
            Self::NegativeIndex => "index must be non-negative",
            Self::IndexOverflow => "index is too large",
            Self::IndexOutOfRange => "index out of range",
            Self::DuplicateIndex => "duplicate index value",
            Self::MissingIndex => "no value is given for index",
        }
    }

    /// Template for detailed messages. Contains a `{}` placeholder for
    /// caller-provided detail.
    pub fn custom_message(&self) -> String {
        match self {
            Self::DuplicateIndex => "duplicate index value {}".to_string(),
            Self::MissingIndex => "no value is given for index {}".to_string(),
            Self::OmitOnMandatoryField => "omit is not allowed for mandatory field `{}`".to_string(),
            Self::ValueListNotAllowed => "value list is not allowed for {}".to_string(),
            Self::IndexedListNotAllowed => {
                "indexed assignment notation is not allowed for {}".to_string()
            }
            // Standard pattern: fallback + context
            _ => format!("{}: {{}}", self.fallback_message()),
        }
    }

    /// Render the final message.
    ///
    /// - `None` → returns `fallback_message()`
    /// - `Some(detail)` → returns `custom_message()` with `{}` replaced
    pub fn message(&self, detail: Option<&str>) -> String {
        match detail {
            None => self.fallback_message().to_string(),
            Some(detail) => self.custom_message().replace("{}", detail),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedInfo {
    pub(crate) range: TextRange,
    pub(crate) message: String,
}

impl RelatedInfo {
    pub fn new(range: TextRange, message: impl Into<String>) -> Self {
        Self {
            range,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DiagnosticMessage {
    pub(crate) kind: DiagnosticKind,
    pub(crate) range: TextRange,
    pub(crate) message: String,
    /// Overrides the kind's default severity when set.
    pub(crate) severity: Option<Severity>,
    pub(crate) related: Vec<RelatedInfo>,
    pub(crate) hints: Vec<String>,
}

impl DiagnosticMessage {
    pub(crate) fn with_default_message(kind: DiagnosticKind, range: TextRange) -> Self {
        let hints = kind.default_hint().map(str::to_owned).into_iter().collect();
        Self {
            kind,
            range,
            message: kind.fallback_message().to_string(),
            severity: None,
            related: Vec::new(),
            hints,
        }
    }

    pub(crate) fn severity(&self) -> Severity {
        self.severity.unwrap_or_else(|| self.kind.default_severity())
    }

    pub(crate) fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }

    pub(crate) fn is_warning(&self) -> bool {
        self.severity() == Severity::Warning
    }
}

impl std::fmt::Display for DiagnosticMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}..{}: {}",
            self.severity(),
            u32::from(self.range.start()),
            u32::from(self.range.end()),
            self.message
        )?;
        for related in &self.related {
            write!(
                f,
                " (related: {} at {}..{})",
                related.message,
                u32::from(related.range.start()),
                u32::from(related.range.end())
            )?;
        }
        for hint in &self.hints {
            write!(f, " (hint: {})", hint)?;
        }
        Ok(())
    }
}
