/// Kind tag of a git object, used when computing hashes and encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Tree,
    Commit,
}

impl ObjectType {
    pub fn as_str(&self) -> &str {
        match self {
            ObjectType::Tree => "tree",
            ObjectType::Commit => "commit",
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
