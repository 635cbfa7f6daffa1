//! Flag storage and the resolution pass.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use super::rules::{Compiled, Rule};
use super::ConstraintError;

/// A named boolean flag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToggleNode {
    pub name: String,
    pub value: bool,
}

/// A flag that ended a pass in a different state than it started.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlagChange {
    pub name: String,
    pub value: bool,
}

/// A control whose editability changed during a pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockChange {
    pub control: String,
    pub locked: bool,
}

/// Outcome of one resolution pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Flags that changed, in declaration order.
    pub changes: Vec<FlagChange>,
    /// Controls that became locked or unlocked.
    pub lock_changes: Vec<LockChange>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.lock_changes.is_empty()
    }

    /// Value the pass assigned to `name`, if it changed.
    pub fn change_of(&self, name: &str) -> Option<bool> {
        self.changes.iter().find(|c| c.name == name).map(|c| c.value)
    }
}

/// A node's flags together with the rules relating them.
///
/// Every accepted change goes through one pass: the immediate intent of
/// the change first, then every rule in declaration order repairs its own
/// violation with the changed flag taking precedence, then one more sweep.
/// If a rule still fails after that the change is refused and the flags are
/// left exactly as they were.
#[derive(Clone, Debug)]
pub struct ConstraintSet {
    label: String,
    flags: Vec<ToggleNode>,
    rules: Vec<Rule>,
    compiled: Vec<Compiled>,
}

impl ConstraintSet {
    /// Builds a set from `(name, initial value)` pairs and rules.
    ///
    /// Initial values are normalized, so the set satisfies every rule from
    /// the start.
    pub fn new<S: Into<String>>(
        label: S,
        flags: &[(&str, bool)],
        rules: Vec<Rule>,
    ) -> Result<Self, ConstraintError> {
        let mut nodes: Vec<ToggleNode> = Vec::with_capacity(flags.len());
        for (name, value) in flags {
            if nodes.iter().any(|n| n.name == *name) {
                return Err(ConstraintError::DuplicateFlag(name.to_string()));
            }
            nodes.push(ToggleNode {
                name: name.to_string(),
                value: *value,
            });
        }

        let lookup = |name: &str| nodes.iter().position(|n| n.name == name);
        let compiled = rules
            .iter()
            .enumerate()
            .map(|(i, rule)| rule.compile(i, &lookup))
            .collect::<Result<Vec<_>, _>>()?;

        let mut set = Self {
            label: label.into(),
            flags: nodes,
            rules,
            compiled,
        };
        set.normalize()?;
        Ok(set)
    }

    /// Name used in diagnostics, usually the node type.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn flags(&self) -> &[ToggleNode] {
        &self.flags
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn value(&self, name: &str) -> Option<bool> {
        self.index_of(name).map(|i| self.flags[i].value)
    }

    /// Whether the control named `name` is currently read-only.
    pub fn is_locked(&self, name: &str) -> bool {
        self.locking_rule(name, &self.values()).is_some()
    }

    /// Every control that is currently read-only.
    pub fn locked_controls(&self) -> Vec<String> {
        self.locked_set(&self.values()).into_iter().collect()
    }

    /// Whether every rule holds for the current values.
    pub fn is_consistent(&self) -> bool {
        self.first_violation(&self.values()).is_none()
    }

    /// Requests `name = value` on behalf of the user.
    ///
    /// Toggling a locked flag is refused. On success the flags satisfy
    /// every rule and the returned resolution lists what moved.
    pub fn try_toggle(&mut self, name: &str, value: bool) -> Result<Resolution, ConstraintError> {
        let index = self
            .index_of(name)
            .ok_or_else(|| ConstraintError::UnknownFlag(name.to_string()))?;
        if self.locking_rule(name, &self.values()).is_some() {
            return Err(ConstraintError::Locked(name.to_string()));
        }
        self.resolve(Some((index, value)))
    }

    /// Like [`try_toggle`](Self::try_toggle), but ignores locks. Used when
    /// the change comes from the host rather than the user.
    pub fn force(&mut self, name: &str, value: bool) -> Result<Resolution, ConstraintError> {
        let index = self
            .index_of(name)
            .ok_or_else(|| ConstraintError::UnknownFlag(name.to_string()))?;
        self.resolve(Some((index, value)))
    }

    /// Host-facing toggle entry point.
    ///
    /// Errors are logged and swallowed; `on_resolved` is called once per
    /// flag that changed.
    pub fn on_toggle(
        &mut self,
        name: &str,
        value: bool,
        on_resolved: impl FnMut(&str, bool),
    ) -> Resolution {
        let result = self.try_toggle(name, value);
        self.report(name, value, result, on_resolved)
    }

    /// Host-facing counterpart of [`force`](Self::force), reporting like
    /// [`on_toggle`](Self::on_toggle).
    pub fn on_force(
        &mut self,
        name: &str,
        value: bool,
        on_resolved: impl FnMut(&str, bool),
    ) -> Resolution {
        let result = self.force(name, value);
        self.report(name, value, result, on_resolved)
    }

    fn report(
        &self,
        name: &str,
        value: bool,
        result: Result<Resolution, ConstraintError>,
        mut on_resolved: impl FnMut(&str, bool),
    ) -> Resolution {
        match result {
            Ok(resolution) => {
                for change in &resolution.changes {
                    on_resolved(&change.name, change.value);
                }
                resolution
            }
            Err(err @ ConstraintError::Unresolved { .. }) => {
                log::error!("{}: toggle {}={} refused: {}", self.label, name, value, err);
                Resolution::default()
            }
            Err(err) => {
                log::warn!("{}: toggle {}={} ignored: {}", self.label, name, value, err);
                Resolution::default()
            }
        }
    }

    /// Loads stored values, then repairs them.
    ///
    /// Unknown names are skipped. If the stored combination cannot be
    /// repaired the previous values are kept.
    pub fn restore<'a, I>(&mut self, values: I) -> Result<Resolution, ConstraintError>
    where
        I: IntoIterator<Item = (&'a str, bool)>,
    {
        let before = self.values();
        for (name, value) in values {
            match self.index_of(name) {
                Some(i) => self.flags[i].value = value,
                None => log::debug!("{}: skipping unknown stored flag '{}'", self.label, name),
            }
        }
        match self.normalize() {
            Ok(mut resolution) => {
                // Report against the values before loading, not the loaded ones.
                resolution.changes = self.diff(&before);
                Ok(resolution)
            }
            Err(err) => {
                self.apply(&before);
                Err(err)
            }
        }
    }

    /// Repairs the current values without a user change.
    pub fn normalize(&mut self) -> Result<Resolution, ConstraintError> {
        self.resolve(None)
    }

    fn resolve(&mut self, change: Option<(usize, bool)>) -> Result<Resolution, ConstraintError> {
        let before = self.values();
        let mut state = before.clone();
        let changed = change.map(|(index, _)| index);

        if let Some((index, value)) = change {
            state[index] = value;
            for rule in &self.compiled {
                rule.intent(index, value, &mut state);
            }
        }

        for _sweep in 0..2 {
            for rule in &self.compiled {
                rule.enforce(changed, &before, &mut state);
            }
            if self.first_violation(&state).is_none() {
                break;
            }
        }

        if let Some(rule) = self.first_violation(&state) {
            return Err(ConstraintError::Unresolved {
                rule,
                kind: self.rules[rule].kind(),
            });
        }

        let locked_before = self.locked_set(&before);
        self.apply(&state);
        let locked_after = self.locked_set(&state);

        let mut lock_changes: Vec<LockChange> = locked_after
            .difference(&locked_before)
            .map(|c| LockChange {
                control: c.clone(),
                locked: true,
            })
            .collect();
        lock_changes.extend(locked_before.difference(&locked_after).map(|c| LockChange {
            control: c.clone(),
            locked: false,
        }));

        let resolution = Resolution {
            changes: self.diff(&before),
            lock_changes,
        };
        if !resolution.is_empty() {
            log::trace!("{}: resolved {:?}", self.label, resolution);
        }
        Ok(resolution)
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.flags.iter().position(|n| n.name == name)
    }

    fn values(&self) -> Vec<bool> {
        self.flags.iter().map(|n| n.value).collect()
    }

    fn apply(&mut self, state: &[bool]) {
        for (node, &value) in self.flags.iter_mut().zip(state) {
            node.value = value;
        }
    }

    fn diff(&self, before: &[bool]) -> Vec<FlagChange> {
        self.flags
            .iter()
            .zip(before)
            .filter(|(node, was)| node.value != **was)
            .map(|(node, _)| FlagChange {
                name: node.name.clone(),
                value: node.value,
            })
            .collect()
    }

    fn first_violation(&self, state: &[bool]) -> Option<usize> {
        self.compiled.iter().position(|rule| !rule.holds(state))
    }

    fn locking_rule(&self, name: &str, state: &[bool]) -> Option<usize> {
        self.compiled
            .iter()
            .position(|rule| rule.locked_target(state) == Some(name))
    }

    fn locked_set(&self, state: &[bool]) -> BTreeSet<String> {
        self.compiled
            .iter()
            .filter_map(|rule| rule.locked_target(state))
            .map(str::to_string)
            .collect()
    }

    /// Every control some rule can lock.
    pub fn lockable_controls(&self) -> BTreeSet<&str> {
        self.compiled.iter().filter_map(Compiled::lock_target).collect()
    }
}

/// A constraint set shared between a widget and the callbacks it fires.
///
/// Changes made from inside `on_resolved` callbacks would re-enter the
/// resolution pass; they are dropped instead, so one user action produces
/// exactly one pass.
#[derive(Clone, Debug)]
pub struct SharedConstraintSet(Rc<RefCell<ConstraintSet>>);

impl SharedConstraintSet {
    pub fn new(set: ConstraintSet) -> Self {
        Self(Rc::new(RefCell::new(set)))
    }

    /// Runs a toggle pass. Returns `None` if a pass is already running.
    pub fn toggle(
        &self,
        name: &str,
        value: bool,
        on_resolved: impl FnMut(&str, bool),
    ) -> Option<Resolution> {
        let Ok(mut set) = self.0.try_borrow_mut() else {
            log::trace!("nested toggle of '{}' ignored", name);
            return None;
        };
        Some(set.on_toggle(name, value, on_resolved))
    }

    /// Runs a pass that ignores locks. Returns `None` if a pass is already
    /// running.
    pub fn force(
        &self,
        name: &str,
        value: bool,
        on_resolved: impl FnMut(&str, bool),
    ) -> Option<Resolution> {
        let Ok(mut set) = self.0.try_borrow_mut() else {
            log::trace!("nested force of '{}' ignored", name);
            return None;
        };
        Some(set.on_force(name, value, on_resolved))
    }

    pub fn value(&self, name: &str) -> Option<bool> {
        self.0.try_borrow().ok().and_then(|set| set.value(name))
    }

    pub fn is_locked(&self, name: &str) -> bool {
        self.0.try_borrow().map_or(false, |set| set.is_locked(name))
    }

    /// Read access; `None` while a pass is running.
    pub fn with<R>(&self, f: impl FnOnce(&ConstraintSet) -> R) -> Option<R> {
        self.0.try_borrow().ok().map(|set| f(&set))
    }

    /// Write access; `None` while a pass is running.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut ConstraintSet) -> R) -> Option<R> {
        self.0.try_borrow_mut().ok().map(|mut set| f(&mut set))
    }
}
