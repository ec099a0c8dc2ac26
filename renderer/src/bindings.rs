use std::collections::HashMap;

/// One scope of template data: named scalars and named loops.
///
/// Scalars and loops live in separate namespaces, so a name may exist in
/// both. Loop children are themselves `Bindings`, which makes the whole
/// environment a tree built top-down by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    variables: HashMap<String, Vec<u8>>,
    loops: HashMap<String, Loop>,
}

/// A named, ordered sequence of child scopes; one per iteration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Loop {
    children: Vec<Bindings>,
}

impl Bindings {
    pub fn new() -> Self {
        Bindings::default()
    }

    /// Set a scalar, replacing any previous value.
    pub fn set(&mut self, name: &str, value: impl AsRef<[u8]>) {
        self.set_bytes(name, value.as_ref());
    }

    /// Set a scalar from an explicit byte slice. Embedded NULs are kept.
    pub fn set_bytes(&mut self, name: &str, value: &[u8]) {
        match self.variables.get_mut(name) {
            Some(existing) => {
                existing.clear();
                existing.extend_from_slice(value);
            }
            None => {
                self.variables.insert(name.to_string(), value.to_vec());
            }
        }
    }

    /// Set a scalar by taking ownership of `value`; no copy is made.
    pub fn set_owned(&mut self, name: impl Into<String>, value: Vec<u8>) {
        self.variables.insert(name.into(), value);
    }

    pub fn set_string(&mut self, name: impl Into<String>, value: String) {
        self.set_owned(name, value.into_bytes());
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.variables.get(name).map(Vec::as_slice)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| std::str::from_utf8(v).ok())
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        self.variables.remove(name)
    }

    /// Fetch the loop called `name`, creating an empty one if needed.
    pub fn add_loop(&mut self, name: &str) -> &mut Loop {
        self.loops.entry(name.to_string()).or_default()
    }

    pub fn get_loop(&self, name: &str) -> Option<&Loop> {
        self.loops.get(name)
    }

    /// Truth value of `name` for `TMPL_IF`/`TMPL_UNLESS`.
    ///
    /// A scalar is true when it is non-empty and not `"0"`. Without a scalar
    /// of that name, a loop is true when it has at least one child.
    pub fn condition(&self, name: &str) -> bool {
        match self.get(name) {
            Some(value) => !value.is_empty() && value != b"0".as_slice(),
            None => self.get_loop(name).is_some_and(|l| !l.is_empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty() && self.loops.is_empty()
    }
}

impl Loop {
    pub fn new() -> Self {
        Loop::default()
    }

    /// Append a child scope.
    pub fn add(&mut self, child: Bindings) {
        self.children.push(child);
    }

    /// Append an empty child scope and return it for filling in.
    pub fn push_new(&mut self) -> &mut Bindings {
        self.children.push(Bindings::new());
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bindings> {
        self.children.iter()
    }
}

impl<'a> IntoIterator for &'a Loop {
    type Item = &'a Bindings;
    type IntoIter = std::slice::Iter<'a, Bindings>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<Bindings> for Loop {
    fn from_iter<I: IntoIterator<Item = Bindings>>(iter: I) -> Self {
        Loop {
            children: iter.into_iter().collect(),
        }
    }
}
