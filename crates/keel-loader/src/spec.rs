//! Declarative description of a library to resolve.

/// A library by generic name, with fallback names and libraries that must
/// be loaded before it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LibrarySpec {
    /// Generic name, also the cache key.
    pub name: String,
    /// Names tried, in order, when `name` does not resolve.
    pub alt_names: Vec<String>,
    /// Loaded depth-first before this library.
    pub dependencies: Vec<LibrarySpec>,
}

impl LibrarySpec {
    /// A spec with no alternates and no dependencies.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alt_names: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    /// Adds a fallback name.
    pub fn alt_name(mut self, name: impl Into<String>) -> Self {
        self.alt_names.push(name.into());
        self
    }

    /// Adds a dependency.
    pub fn dependency(mut self, spec: LibrarySpec) -> Self {
        self.dependencies.push(spec);
        self
    }

    /// The primary name followed by the alternates.
    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.alt_names.iter().map(String::as_str))
    }
}

impl From<&str> for LibrarySpec {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_put_primary_first() {
        let spec = LibrarySpec::new("SDL2").alt_name("SDL2-2.0").alt_name("SDL2-2.0.so.0");
        let names: Vec<_> = spec.candidates().collect();
        assert_eq!(names, ["SDL2", "SDL2-2.0", "SDL2-2.0.so.0"]);
    }

    #[test]
    fn dependencies_nest() {
        let spec = LibrarySpec::new("avcodec").dependency(LibrarySpec::new("avutil"));
        assert_eq!(spec.dependencies[0].name, "avutil");
        assert_eq!(LibrarySpec::from("lua"), LibrarySpec::new("lua"));
    }
}
