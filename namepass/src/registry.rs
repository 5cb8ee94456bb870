// registry.rs — Scoped identifier registry
//
// Tracks which strings are taken in a namespace of nested scopes. A name
// reserved in one scope blocks every other scope, except when the two scopes
// sit in different branches of the same alternative group (e.g. the "then"
// and "else" bodies of a conditional), which never execute together.
//
// Preconditions: scope IDs passed in were opened on this registry.
// Postconditions: none.
// Failure modes: none.
// Side effects: none beyond registry state.

use std::collections::HashMap;

// ── Scopes ──────────────────────────────────────────────────────────────────

/// Handle to a scope opened on a `NameRegistry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

#[derive(Debug, Clone)]
struct Scope {
    parent: Option<ScopeId>,
    depth: u32,
    /// Alternative group this scope is a branch of, if any.
    group: Option<u32>,
}

// ── Registry ────────────────────────────────────────────────────────────────

/// A uniqueness tracker for one flat namespace of strings, partitioned into
/// scopes. Friendly names and tensor names use separate registries.
#[derive(Debug, Clone)]
pub struct NameRegistry {
    scopes: Vec<Scope>,
    reserved: HashMap<String, Vec<ScopeId>>,
    next_group: u32,
    first_suffix: u32,
}

impl NameRegistry {
    /// Create a registry with a single root scope. Generated names use
    /// numeric suffixes starting at `first_suffix`.
    pub fn new(first_suffix: u32) -> Self {
        NameRegistry {
            scopes: vec![Scope {
                parent: None,
                depth: 0,
                group: None,
            }],
            reserved: HashMap::new(),
            next_group: 0,
            first_suffix,
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Open a child scope that shares the namespace with everything else.
    pub fn open_scope(&mut self, parent: ScopeId) -> ScopeId {
        self.push_scope(parent, None)
    }

    /// Open `count` sibling scopes that are mutually exclusive: a name
    /// reserved in one of them does not block the others.
    pub fn open_alternatives(&mut self, parent: ScopeId, count: usize) -> Vec<ScopeId> {
        let group = self.next_group;
        self.next_group += 1;
        (0..count).map(|_| self.push_scope(parent, Some(group))).collect()
    }

    fn push_scope(&mut self, parent: ScopeId, group: Option<u32>) -> ScopeId {
        let depth = self.scopes[parent.0 as usize].depth + 1;
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent: Some(parent),
            depth,
            group,
        });
        id
    }

    /// True if no scope visible from `scope` has reserved `name`.
    pub fn is_free(&self, scope: ScopeId, name: &str) -> bool {
        match self.reserved.get(name) {
            Some(holders) => holders.iter().all(|&h| self.exclusive(h, scope)),
            None => true,
        }
    }

    /// Reserve `name` in `scope`. Returns false if it was already taken;
    /// the reservation is recorded either way.
    pub fn reserve(&mut self, scope: ScopeId, name: &str) -> bool {
        let was_free = self.is_free(scope, name);
        self.reserved.entry(name.to_string()).or_default().push(scope);
        was_free
    }

    /// `base` if free, otherwise `base_n` for the smallest free `n` starting
    /// at the registry's first suffix.
    pub fn next_free(&self, scope: ScopeId, base: &str) -> String {
        if self.is_free(scope, base) {
            return base.to_string();
        }
        self.next_free_suffixed(scope, base, "")
    }

    /// Smallest free `base_n<tail>`, always suffixed. Used for names whose
    /// trailing part (a port index) must survive the rename.
    pub fn next_free_suffixed(&self, scope: ScopeId, base: &str, tail: &str) -> String {
        let mut n = self.first_suffix;
        loop {
            let candidate = format!("{}_{}{}", base, n, tail);
            if self.is_free(scope, &candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Two scopes are exclusive when their paths to the root split at a
    /// common parent into two different branches of one alternative group.
    fn exclusive(&self, a: ScopeId, b: ScopeId) -> bool {
        let (mut a, mut b) = (a, b);
        let (mut a_child, mut b_child) = (None, None);
        while self.scope(a).depth > self.scope(b).depth {
            a_child = Some(a);
            a = self.parent(a);
        }
        while self.scope(b).depth > self.scope(a).depth {
            b_child = Some(b);
            b = self.parent(b);
        }
        while a != b {
            a_child = Some(a);
            b_child = Some(b);
            a = self.parent(a);
            b = self.parent(b);
        }
        match (a_child, b_child) {
            (Some(x), Some(y)) if x != y => {
                let (gx, gy) = (self.scope(x).group, self.scope(y).group);
                gx.is_some() && gx == gy
            }
            // One scope encloses the other.
            _ => false,
        }
    }

    fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    fn parent(&self, id: ScopeId) -> ScopeId {
        self.scope(id).parent.unwrap_or(id)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_free_returns_base_when_unused() {
        let reg = NameRegistry::new(2);
        assert_eq!(reg.next_free(reg.root(), "Relu"), "Relu");
    }

    #[test]
    fn next_free_skips_reserved_suffixes() {
        let mut reg = NameRegistry::new(2);
        let root = reg.root();
        assert!(reg.reserve(root, "P"));
        assert!(reg.reserve(root, "P_2"));
        assert_eq!(reg.next_free(root, "P"), "P_3");
    }

    #[test]
    fn first_suffix_is_configurable() {
        let mut reg = NameRegistry::new(1);
        let root = reg.root();
        reg.reserve(root, "S");
        assert_eq!(reg.next_free(root, "S"), "S_1");
    }

    #[test]
    fn reserve_reports_prior_holder() {
        let mut reg = NameRegistry::new(1);
        let root = reg.root();
        assert!(reg.reserve(root, "x"));
        assert!(!reg.reserve(root, "x"));
        assert!(!reg.is_free(root, "x"));
    }

    #[test]
    fn suffixed_keeps_tail() {
        let mut reg = NameRegistry::new(1);
        let root = reg.root();
        reg.reserve(root, "input_1:1");
        assert_eq!(reg.next_free_suffixed(root, "input", ":1"), "input_2:1");
    }

    #[test]
    fn child_scope_conflicts_with_parent_and_back() {
        let mut reg = NameRegistry::new(1);
        let root = reg.root();
        let child = reg.open_scope(root);
        reg.reserve(root, "outer");
        reg.reserve(child, "inner");
        assert!(!reg.is_free(child, "outer"));
        assert!(!reg.is_free(root, "inner"));
    }

    #[test]
    fn alternatives_tolerate_each_other_only() {
        let mut reg = NameRegistry::new(1);
        let root = reg.root();
        let branches = reg.open_alternatives(root, 2);
        let (then_s, else_s) = (branches[0], branches[1]);
        reg.reserve(then_s, "split");
        assert!(reg.is_free(else_s, "split"));
        assert!(!reg.is_free(root, "split"));
        assert!(!reg.is_free(then_s, "split"));

        let nested = reg.open_scope(else_s);
        assert!(reg.is_free(nested, "split"));
        reg.reserve(root, "top");
        assert!(!reg.is_free(nested, "top"));
    }

    #[test]
    fn separate_groups_are_not_alternatives() {
        let mut reg = NameRegistry::new(1);
        let root = reg.root();
        let first = reg.open_alternatives(root, 2);
        let second = reg.open_alternatives(root, 2);
        reg.reserve(first[0], "x");
        assert!(reg.is_free(first[1], "x"));
        assert!(!reg.is_free(second[0], "x"));
    }
}
