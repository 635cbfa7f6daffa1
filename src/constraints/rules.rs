//! Relationship rules between boolean flags.
//!
//! Rules are declared with flag *names* and compiled against a flag table
//! into index form once, when the constraint set is built.

use super::ConstraintError;

/// Which transition of the trigger flag an [`Effect`] reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    /// The flag was set to true.
    Raised,
    /// The flag was set to false.
    Lowered,
}

impl Edge {
    fn matches(self, value: bool) -> bool {
        match self {
            Edge::Raised => value,
            Edge::Lowered => !value,
        }
    }
}

/// What an at-least-one group does when it would become all false.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fallback {
    /// Undo the change that emptied the group.
    Revert,
    /// Raise the named member instead.
    Raise(String),
}

/// A one-shot reaction to a specific flag change.
///
/// Effects express the per-node "intent" of a change: when `trigger` moves
/// along `edge` and every `when` condition holds, the `set` assignments
/// are applied in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Effect {
    pub trigger: String,
    pub edge: Edge,
    pub when: Vec<(String, bool)>,
    pub set: Vec<(String, bool)>,
}

impl Effect {
    /// Reaction to `trigger` being raised.
    pub fn on_raise(trigger: impl Into<String>) -> Self {
        Self::new(trigger, Edge::Raised)
    }

    /// Reaction to `trigger` being lowered.
    pub fn on_lower(trigger: impl Into<String>) -> Self {
        Self::new(trigger, Edge::Lowered)
    }

    fn new(trigger: impl Into<String>, edge: Edge) -> Self {
        Self {
            trigger: trigger.into(),
            edge,
            when: Vec::new(),
            set: Vec::new(),
        }
    }

    /// Only fire while `flag` currently equals `value`.
    pub fn when(mut self, flag: impl Into<String>, value: bool) -> Self {
        self.when.push((flag.into(), value));
        self
    }

    /// Assign `value` to `flag` when fired.
    pub fn set(mut self, flag: impl Into<String>, value: bool) -> Self {
        self.set.push((flag.into(), value));
        self
    }
}

/// A declared relationship between flags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rule {
    /// `when` true requires `then` true. Raising `when` raises `then`;
    /// lowering `then` lowers `when`.
    Implies { when: String, then: String },
    /// `a` and `b` are never both true. The flag that was just changed
    /// wins a conflict; otherwise `winner` does.
    Excludes { a: String, b: String, winner: String },
    /// The group may never be all false.
    AtLeastOne { members: Vec<String>, fallback: Fallback },
    /// Radio group: exactly one member is true.
    ExactlyOne { members: Vec<String>, default: String },
    /// `master` mirrors "any member is on"; changing `master` sets every
    /// member to the same value.
    Master { master: String, members: Vec<String> },
    /// Change-specific reaction.
    Effect(Effect),
    /// While `controller` is true the control named `target` is read-only.
    /// `target` may be a flag of this set or any other control of the node.
    Locks { controller: String, target: String },
}

impl Rule {
    pub fn implies(when: impl Into<String>, then: impl Into<String>) -> Self {
        Rule::Implies {
            when: when.into(),
            then: then.into(),
        }
    }

    /// Pairwise exclusion where `a` wins conflicts nobody asked for.
    pub fn excludes(a: impl Into<String>, b: impl Into<String>) -> Self {
        let a = a.into();
        Rule::Excludes {
            winner: a.clone(),
            a,
            b: b.into(),
        }
    }

    /// Pairwise exclusion with an explicit winner.
    pub fn excludes_preferring(
        a: impl Into<String>,
        b: impl Into<String>,
        winner: impl Into<String>,
    ) -> Self {
        Rule::Excludes {
            a: a.into(),
            b: b.into(),
            winner: winner.into(),
        }
    }

    pub fn at_least_one<I, S>(members: I, fallback: Fallback) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Rule::AtLeastOne {
            members: members.into_iter().map(Into::into).collect(),
            fallback,
        }
    }

    pub fn exactly_one<I, S>(members: I, default: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Rule::ExactlyOne {
            members: members.into_iter().map(Into::into).collect(),
            default: default.into(),
        }
    }

    pub fn master<I, S>(master: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Rule::Master {
            master: master.into(),
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    pub fn locks(controller: impl Into<String>, target: impl Into<String>) -> Self {
        Rule::Locks {
            controller: controller.into(),
            target: target.into(),
        }
    }

    /// Short name of the rule kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Rule::Implies { .. } => "implies",
            Rule::Excludes { .. } => "excludes",
            Rule::AtLeastOne { .. } => "at-least-one",
            Rule::ExactlyOne { .. } => "exactly-one",
            Rule::Master { .. } => "master",
            Rule::Effect(_) => "effect",
            Rule::Locks { .. } => "locks",
        }
    }

    /// Resolves flag names to indices.
    pub(crate) fn compile(
        &self,
        position: usize,
        lookup: &dyn Fn(&str) -> Option<usize>,
    ) -> Result<Compiled, ConstraintError> {
        let flag = |name: &str| {
            lookup(name).ok_or_else(|| ConstraintError::UnknownFlag(name.to_string()))
        };
        let group = |members: &[String]| -> Result<Vec<usize>, ConstraintError> {
            if members.is_empty() {
                return Err(ConstraintError::EmptyGroup { rule: position });
            }
            members.iter().map(|m| flag(m.as_str())).collect()
        };

        Ok(match self {
            Rule::Implies { when, then } => Compiled::Implies {
                when: flag(when.as_str())?,
                then: flag(then.as_str())?,
            },
            Rule::Excludes { a, b, winner } => {
                let (a, b, winner) = (flag(a.as_str())?, flag(b.as_str())?, flag(winner.as_str())?);
                if winner != a && winner != b {
                    return Err(ConstraintError::MalformedRule {
                        rule: position,
                        reason: "exclusion winner is not one of the pair",
                    });
                }
                Compiled::Excludes { a, b, winner }
            }
            Rule::AtLeastOne { members, fallback } => Compiled::AtLeastOne {
                members: group(members)?,
                fallback: match fallback {
                    Fallback::Revert => None,
                    Fallback::Raise(name) => Some(flag(name.as_str())?),
                },
            },
            Rule::ExactlyOne { members, default } => {
                let members = group(members)?;
                let default = flag(default.as_str())?;
                if !members.contains(&default) {
                    return Err(ConstraintError::MalformedRule {
                        rule: position,
                        reason: "radio default is not a member of the group",
                    });
                }
                Compiled::ExactlyOne { members, default }
            }
            Rule::Master { master, members } => Compiled::Master {
                master: flag(master.as_str())?,
                members: group(members)?,
            },
            Rule::Effect(effect) => Compiled::Effect {
                trigger: flag(effect.trigger.as_str())?,
                edge: effect.edge,
                when: effect
                    .when
                    .iter()
                    .map(|(name, value)| Ok((flag(name.as_str())?, *value)))
                    .collect::<Result<_, ConstraintError>>()?,
                set: effect
                    .set
                    .iter()
                    .map(|(name, value)| Ok((flag(name.as_str())?, *value)))
                    .collect::<Result<_, ConstraintError>>()?,
            },
            Rule::Locks { controller, target } => Compiled::Locks {
                controller: flag(controller.as_str())?,
                target: target.clone(),
            },
        })
    }
}

impl From<Effect> for Rule {
    fn from(effect: Effect) -> Self {
        Rule::Effect(effect)
    }
}

/// A rule with flag names resolved to indices.
#[derive(Clone, Debug)]
pub(crate) enum Compiled {
    Implies { when: usize, then: usize },
    Excludes { a: usize, b: usize, winner: usize },
    AtLeastOne { members: Vec<usize>, fallback: Option<usize> },
    ExactlyOne { members: Vec<usize>, default: usize },
    Master { master: usize, members: Vec<usize> },
    Effect {
        trigger: usize,
        edge: Edge,
        when: Vec<(usize, bool)>,
        set: Vec<(usize, bool)>,
    },
    Locks { controller: usize, target: String },
}

impl Compiled {
    /// Applies the immediate consequence of `changed` becoming `value`.
    pub(crate) fn intent(&self, changed: usize, value: bool, state: &mut [bool]) {
        match self {
            Compiled::Implies { when, then } => {
                if changed == *when && value {
                    state[*then] = true;
                } else if changed == *then && !value {
                    state[*when] = false;
                }
            }
            Compiled::Excludes { a, b, .. } => {
                if value && changed == *a {
                    state[*b] = false;
                } else if value && changed == *b {
                    state[*a] = false;
                }
            }
            Compiled::ExactlyOne { members, .. } => {
                if value && members.contains(&changed) {
                    for &m in members.iter().filter(|&&m| m != changed) {
                        state[m] = false;
                    }
                }
            }
            Compiled::Master { master, members } => {
                if changed == *master {
                    for &m in members {
                        state[m] = value;
                    }
                }
            }
            Compiled::Effect { trigger, edge, when, set } => {
                if changed == *trigger
                    && edge.matches(value)
                    && when.iter().all(|&(flag, expected)| state[flag] == expected)
                {
                    for &(flag, assigned) in set {
                        state[flag] = assigned;
                    }
                }
            }
            Compiled::AtLeastOne { .. } | Compiled::Locks { .. } => {}
        }
    }

    /// Repairs a violation of this rule, if any.
    ///
    /// `changed` is the flag the user touched (none during normalization)
    /// and `before` the state at the start of the pass.
    pub(crate) fn enforce(&self, changed: Option<usize>, before: &[bool], state: &mut [bool]) {
        match self {
            Compiled::Implies { when, then } => {
                if state[*when] && !state[*then] {
                    if changed == Some(*then) {
                        state[*when] = false;
                    } else {
                        state[*then] = true;
                    }
                }
            }
            Compiled::Excludes { a, b, winner } => {
                if state[*a] && state[*b] {
                    let keep = match changed {
                        Some(c) if c == *a || c == *b => c,
                        _ => *winner,
                    };
                    let lose = if keep == *a { *b } else { *a };
                    state[lose] = false;
                }
            }
            Compiled::AtLeastOne { members, fallback } => {
                if members.iter().any(|&m| state[m]) {
                    return;
                }
                let raise = match (fallback, changed) {
                    (Some(flag), _) => *flag,
                    (None, Some(c)) if members.contains(&c) && before[c] => c,
                    _ => members[0],
                };
                state[raise] = true;
            }
            Compiled::ExactlyOne { members, default } => {
                let on: Vec<usize> = members.iter().copied().filter(|&m| state[m]).collect();
                match on.len() {
                    0 => {
                        let raise = match changed {
                            Some(c) if members.contains(&c) => c,
                            _ => *default,
                        };
                        state[raise] = true;
                    }
                    1 => {}
                    _ => {
                        let keep = match changed {
                            Some(c) if on.contains(&c) => c,
                            _ => on[0],
                        };
                        for &m in on.iter().filter(|&&m| m != keep) {
                            state[m] = false;
                        }
                    }
                }
            }
            Compiled::Master { master, members } => {
                state[*master] = members.iter().any(|&m| state[m]);
            }
            Compiled::Effect { .. } | Compiled::Locks { .. } => {}
        }
    }

    /// Whether the rule is satisfied by `state`.
    pub(crate) fn holds(&self, state: &[bool]) -> bool {
        match self {
            Compiled::Implies { when, then } => !state[*when] || state[*then],
            Compiled::Excludes { a, b, .. } => !(state[*a] && state[*b]),
            Compiled::AtLeastOne { members, .. } => members.iter().any(|&m| state[m]),
            Compiled::ExactlyOne { members, .. } => {
                members.iter().filter(|&&m| state[m]).count() == 1
            }
            Compiled::Master { master, members } => {
                state[*master] == members.iter().any(|&m| state[m])
            }
            Compiled::Effect { .. } | Compiled::Locks { .. } => true,
        }
    }

    /// The control this rule currently locks, if any.
    pub(crate) fn locked_target(&self, state: &[bool]) -> Option<&str> {
        match self {
            Compiled::Locks { controller, target } if state[*controller] => Some(target),
            _ => None,
        }
    }

    /// The control this rule can lock, if it is a lock rule.
    pub(crate) fn lock_target(&self) -> Option<&str> {
        match self {
            Compiled::Locks { target, .. } => Some(target),
            _ => None,
        }
    }
}
