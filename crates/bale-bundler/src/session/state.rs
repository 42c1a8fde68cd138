//! Per-module build state within a session.

use std::fmt;

use bale_graph::ModuleId;
use rustc_hash::FxHashMap;

/// Where a module stands between builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ModuleState {
    /// Not seen by any completed build
    #[default]
    Unbuilt,
    /// Part of the build currently running
    Building,
    /// Up to date with the last completed build
    Built,
    /// A file it depends on changed since it was built
    Stale,
}

impl ModuleState {
    /// Whether moving from `self` to `next` is allowed.
    ///
    /// A running build that is cancelled or fails sends its modules back to
    /// `Stale`, since they still need a rebuild.
    pub fn can_transition_to(self, next: ModuleState) -> bool {
        use ModuleState::*;
        matches!(
            (self, next),
            (Unbuilt, Building)
                | (Building, Built)
                | (Building, Stale)
                | (Built, Stale)
                | (Stale, Building)
                | (Stale, Stale)
        )
    }
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModuleState::Unbuilt => "unbuilt",
            ModuleState::Building => "building",
            ModuleState::Built => "built",
            ModuleState::Stale => "stale",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("module {module} cannot go from {from} to {to}")]
pub struct InvalidTransition {
    pub module: ModuleId,
    pub from: ModuleState,
    pub to: ModuleState,
}

/// State of every module a session knows about.
#[derive(Debug, Clone, Default)]
pub struct ModuleStates {
    states: FxHashMap<ModuleId, ModuleState>,
}

impl ModuleStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state; unknown modules are [`ModuleState::Unbuilt`].
    pub fn get(&self, id: &ModuleId) -> ModuleState {
        self.states.get(id).copied().unwrap_or_default()
    }

    pub fn transition(&mut self, id: &ModuleId, to: ModuleState) -> Result<(), InvalidTransition> {
        let from = self.get(id);
        if !from.can_transition_to(to) {
            return Err(InvalidTransition {
                module: id.clone(),
                from,
                to,
            });
        }
        self.states.insert(id.clone(), to);
        Ok(())
    }

    /// Mark built modules stale. Modules in other states are left alone.
    pub fn mark_stale<'a>(&mut self, ids: impl IntoIterator<Item = &'a ModuleId>) -> usize {
        let mut marked = 0;
        for id in ids {
            if matches!(self.get(id), ModuleState::Built | ModuleState::Stale) {
                self.states.insert(id.clone(), ModuleState::Stale);
                marked += 1;
            }
        }
        marked
    }

    /// Move every stale module into `Building`.
    pub fn begin_build(&mut self) {
        for state in self.states.values_mut() {
            if *state == ModuleState::Stale {
                *state = ModuleState::Building;
            }
        }
    }

    /// Record a completed build over `modules`: they end `Built`, modules
    /// no longer in the graph are forgotten.
    pub fn finish_build(&mut self, modules: &[ModuleId]) {
        let mut next = FxHashMap::default();
        for id in modules {
            next.insert(id.clone(), ModuleState::Built);
        }
        self.states = next;
    }

    /// Record a failed or cancelled build: everything in flight is stale again.
    pub fn abort_build(&mut self) {
        for state in self.states.values_mut() {
            if *state == ModuleState::Building {
                *state = ModuleState::Stale;
            }
        }
    }

    pub fn count(&self, state: ModuleState) -> usize {
        self.states.values().filter(|s| **s == state).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModuleId, ModuleState)> {
        self.states.iter().map(|(id, state)| (id, *state))
    }
}
