//! Static call-site descriptors.

use std::fmt;

/// Visibility of an advised method, as matched by `execution(public ...)`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public  => "public",
            Self::Private => "private",
        }
    }

    pub(crate) fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "public"  => Some(Self::Public),
            "private" => Some(Self::Private),
            _         => None,
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Describes one advisable method: who declares it, what it is called and
/// what it takes.
///
/// Declaring types use dotted names (`app.controller.SendController`) so that
/// pointcut expressions read the same way they are written.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MethodSignature {
    declaring_type: String,
    name: String,
    params: Vec<String>,
    visibility: Visibility,
}

impl MethodSignature {
    /// A public method with no parameters. Chain [`param`](Self::param) to add
    /// parameter types in order.
    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
            params: Vec::new(),
            visibility: Visibility::Public,
        }
    }

    pub fn param(mut self, type_name: impl Into<String>) -> Self {
        self.params.push(type_name.into());
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn declaring_type(&self) -> &str { &self.declaring_type }
    pub fn name(&self) -> &str { &self.name }
    pub fn params(&self) -> &[String] { &self.params }
    pub fn modifiers(&self) -> Visibility { self.visibility }

    /// Last dotted segment of the declaring type.
    pub fn simple_type_name(&self) -> &str {
        self.declaring_type
            .rsplit_once('.')
            .map_or(self.declaring_type.as_str(), |(_, simple)| simple)
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}.{}({})", self.visibility, self.declaring_type, self.name, self.params.join(", "))
    }
}
