//! Sequence graphs: the observed valid orderings of an ordered artifact's children.
//!
//! A graph is an automaton over symbols (child artifacts). Each state is keyed
//! by the set of symbols consumed so far; the root is the empty set and a
//! transition on `s` always leads from `S` to `S ∪ {s}`. Keying states by
//! consumed sets lets sequences that agree on a prefix set share structure.
//!
//! Every transition and every accepting mark is tagged with the associations
//! that justify it, so orderings can be withdrawn per association. Two
//! associations that disagree on the relative order of two symbols are both
//! kept; the graph never picks a winner.

use crate::association::AssociationId;
use crate::error::{Error, Result};
use crate::tree::ArtifactId;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// A symbol is an artifact registered in a sequence graph.
pub type Symbol = ArtifactId;

const ROOT: usize = 0;

#[derive(Debug, Clone)]
struct Transition {
    target: usize,
    associations: BTreeSet<AssociationId>,
}

#[derive(Debug, Clone, Default)]
struct State {
    consumed: BTreeSet<Symbol>,
    transitions: BTreeMap<Symbol, Transition>,
    accepting: BTreeSet<AssociationId>,
}

/// Order-encoding automaton owned by one ordered artifact.
#[derive(Debug, Clone)]
pub struct SequenceGraph {
    states: Vec<State>,
    index: HashMap<BTreeSet<Symbol>, usize>,
    symbols: BTreeSet<Symbol>,
}

impl Default for SequenceGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceGraph {
    /// Create a graph with only the root state.
    pub fn new() -> Self {
        let mut index = HashMap::new();
        index.insert(BTreeSet::new(), ROOT);
        Self {
            states: vec![State::default()],
            index,
            symbols: BTreeSet::new(),
        }
    }

    /// Alphabet of the graph.
    pub fn symbols(&self) -> &BTreeSet<Symbol> {
        &self.symbols
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty() && self.states.len() == 1
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn transition_count(&self) -> usize {
        self.states.iter().map(|s| s.transitions.len()).sum()
    }

    /// Associations tagging any transition on `symbol`.
    pub fn contributors(&self, symbol: Symbol) -> BTreeSet<AssociationId> {
        self.states
            .iter()
            .filter_map(|state| state.transitions.get(&symbol))
            .flat_map(|t| t.associations.iter().copied())
            .collect()
    }

    fn state_for(&mut self, consumed: BTreeSet<Symbol>) -> usize {
        if let Some(&id) = self.index.get(&consumed) {
            return id;
        }
        let id = self.states.len();
        self.index.insert(consumed.clone(), id);
        self.states.push(State {
            consumed,
            ..State::default()
        });
        id
    }

    fn link(
        &mut self,
        from: usize,
        symbol: Symbol,
        target: usize,
        associations: impl IntoIterator<Item = AssociationId>,
    ) {
        self.states[from]
            .transitions
            .entry(symbol)
            .or_insert_with(|| Transition {
                target,
                associations: BTreeSet::new(),
            })
            .associations
            .extend(associations);
    }

    /// Record one observed linear order contributed by `association`.
    ///
    /// Orders learned earlier stay accepted.
    pub fn learn(&mut self, order: &[Symbol], association: AssociationId) -> Result<()> {
        let distinct: BTreeSet<Symbol> = order.iter().copied().collect();
        if distinct.len() != order.len() {
            return Err(Error::invalid_argument(
                "a sequence may contain each symbol at most once",
            ));
        }

        let mut current = ROOT;
        let mut consumed = BTreeSet::new();
        for &symbol in order {
            consumed.insert(symbol);
            let next = self.state_for(consumed.clone());
            self.link(current, symbol, next, [association]);
            current = next;
        }
        self.states[current].accepting.insert(association);
        self.symbols.extend(order.iter().copied());
        Ok(())
    }

    /// Merge all orderings of `other` into this graph.
    ///
    /// Both graphs must use symbols of the same identity space.
    pub fn sequence(&mut self, other: &SequenceGraph) {
        for state in &other.states {
            let from = self.state_for(state.consumed.clone());
            for (&symbol, transition) in &state.transitions {
                let consumed = other.states[transition.target].consumed.clone();
                let target = self.state_for(consumed);
                self.link(from, symbol, target, transition.associations.iter().copied());
            }
            self.states[from]
                .accepting
                .extend(state.accepting.iter().copied());
        }
        self.symbols.extend(other.symbols.iter().copied());
    }

    /// True if `order` is a complete ordering the graph has learned.
    pub fn accepts(&self, order: &[Symbol]) -> bool {
        let mut current = ROOT;
        for symbol in order {
            match self.states[current].transitions.get(symbol) {
                Some(transition) => current = transition.target,
                None => return false,
            }
        }
        !self.states[current].accepting.is_empty()
    }

    /// Enumerate all accepted orderings, sorted.
    pub fn orderings(&self) -> Vec<Vec<Symbol>> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        self.collect_orderings(ROOT, &mut path, &mut out);
        out.sort();
        out
    }

    fn collect_orderings(&self, state: usize, path: &mut Vec<Symbol>, out: &mut Vec<Vec<Symbol>>) {
        if !self.states[state].accepting.is_empty() {
            out.push(path.clone());
        }
        for (&symbol, transition) in &self.states[state].transitions {
            path.push(symbol);
            self.collect_orderings(transition.target, path, out);
            path.pop();
        }
    }

    /// Project the graph onto `retained` symbols.
    ///
    /// Transitions on dropped symbols collapse, so every accepted ordering
    /// survives with the dropped symbols removed.
    pub fn trim(&mut self, retained: &BTreeSet<Symbol>) {
        let mut rebuilt = SequenceGraph::new();
        for state in &self.states {
            let from_key: BTreeSet<Symbol> =
                state.consumed.intersection(retained).copied().collect();
            let from = rebuilt.state_for(from_key.clone());
            rebuilt.states[from]
                .accepting
                .extend(state.accepting.iter().copied());

            for (&symbol, transition) in &state.transitions {
                if !retained.contains(&symbol) {
                    continue;
                }
                let mut to_key = from_key.clone();
                to_key.insert(symbol);
                let to = rebuilt.state_for(to_key);
                rebuilt.link(from, symbol, to, transition.associations.iter().copied());
            }
        }
        rebuilt.symbols = self.symbols.intersection(retained).copied().collect();
        rebuilt.prune();
        *self = rebuilt;
    }

    /// Withdraw every ordering not justified by one of `keep`.
    ///
    /// Symbols no surviving ordering uses leave the symbol set.
    pub fn retain_associations(&mut self, keep: &BTreeSet<AssociationId>) {
        for state in &mut self.states {
            state.accepting.retain(|a| keep.contains(a));
            state.transitions.retain(|_, transition| {
                transition.associations.retain(|a| keep.contains(a));
                !transition.associations.is_empty()
            });
        }
        self.prune();
        self.symbols = self
            .states
            .iter()
            .flat_map(|state| state.transitions.keys().copied())
            .collect();
    }

    /// Replace this graph with a copy of `other`, relabelling every symbol
    /// through `map`.
    ///
    /// Symbols `map` does not resolve are projected away and returned.
    pub fn copy<F>(&mut self, other: &SequenceGraph, map: F) -> Vec<Symbol>
    where
        F: Fn(Symbol) -> Option<Symbol>,
    {
        let mapping: BTreeMap<Symbol, Symbol> = other
            .symbols
            .iter()
            .filter_map(|&s| map(s).map(|t| (s, t)))
            .collect();
        let unmapped: Vec<Symbol> = other
            .symbols
            .iter()
            .copied()
            .filter(|s| !mapping.contains_key(s))
            .collect();

        let mut source = other.clone();
        if !unmapped.is_empty() {
            let retained: BTreeSet<Symbol> = mapping.keys().copied().collect();
            source.trim(&retained);
        }

        let relabel = |set: &BTreeSet<Symbol>| -> BTreeSet<Symbol> {
            set.iter().filter_map(|s| mapping.get(s).copied()).collect()
        };

        let mut index = HashMap::with_capacity(source.states.len());
        let mut states = Vec::with_capacity(source.states.len());
        for (id, state) in source.states.into_iter().enumerate() {
            let consumed = relabel(&state.consumed);
            index.insert(consumed.clone(), id);
            let transitions = state
                .transitions
                .into_iter()
                .filter_map(|(symbol, t)| mapping.get(&symbol).map(|&m| (m, t)))
                .collect();
            states.push(State {
                consumed,
                transitions,
                accepting: state.accepting,
            });
        }

        self.states = states;
        self.index = index;
        self.symbols = relabel(&source.symbols);
        unmapped
    }

    /// Drop states that are unreachable from the root or cannot reach an
    /// accepting state. The root always survives.
    fn prune(&mut self) {
        let count = self.states.len();

        let mut reachable = vec![false; count];
        reachable[ROOT] = true;
        let mut queue = VecDeque::from([ROOT]);
        while let Some(id) = queue.pop_front() {
            for transition in self.states[id].transitions.values() {
                if !reachable[transition.target] {
                    reachable[transition.target] = true;
                    queue.push_back(transition.target);
                }
            }
        }

        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (id, state) in self.states.iter().enumerate() {
            for transition in state.transitions.values() {
                predecessors[transition.target].push(id);
            }
        }
        let mut productive = vec![false; count];
        let mut queue: VecDeque<usize> = (0..count)
            .filter(|&id| !self.states[id].accepting.is_empty())
            .collect();
        for &id in &queue {
            productive[id] = true;
        }
        while let Some(id) = queue.pop_front() {
            for &pred in &predecessors[id] {
                if !productive[pred] {
                    productive[pred] = true;
                    queue.push_back(pred);
                }
            }
        }

        let keep: Vec<bool> = (0..count)
            .map(|id| id == ROOT || (reachable[id] && productive[id]))
            .collect();
        if keep.iter().all(|&k| k) {
            return;
        }

        let mut remap = vec![usize::MAX; count];
        let mut next = 0;
        for id in 0..count {
            if keep[id] {
                remap[id] = next;
                next += 1;
            }
        }

        let old = std::mem::take(&mut self.states);
        self.index.clear();
        for (id, mut state) in old.into_iter().enumerate() {
            if !keep[id] {
                continue;
            }
            state.transitions.retain(|_, t| keep[t.target]);
            for transition in state.transitions.values_mut() {
                transition.target = remap[transition.target];
            }
            self.index.insert(state.consumed.clone(), self.states.len());
            self.states.push(state);
        }
    }
}
