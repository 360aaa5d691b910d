//! Structural clean-up of the emitted block sequence.
//!
//! Direct translation leaves `goto` into the very next block, trampolines that
//! only jump elsewhere and labels nobody references. Go rejects unused labels,
//! so running these passes is required, not cosmetic.

use std::collections::{HashMap, HashSet};

use golower_core::error::{optimization_error, Error, Result};
use golower_core::tracing::debug;

use crate::unit::{GoBlock, GoExit, GoFunction, GoUnit};

const LOG_AREA: &str = "[golang-opt]";
const MAX_ROUNDS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockPassName {
    Validate,
    ThreadJumps,
    DropAdjacentGotos,
    DropDeadLabels,
    DropUnreachable,
    MergeFallthrough,
}

impl BlockPassName {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockPassName::Validate => "validate",
            BlockPassName::ThreadJumps => "thread_jumps",
            BlockPassName::DropAdjacentGotos => "drop_adjacent_gotos",
            BlockPassName::DropDeadLabels => "drop_dead_labels",
            BlockPassName::DropUnreachable => "drop_unreachable",
            BlockPassName::MergeFallthrough => "merge_fallthrough",
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct OptimizationReport {
    pub total_changes: usize,
    pub rounds: usize,
    pub per_pass: HashMap<BlockPassName, usize>,
}

pub trait BlockPass {
    fn name(&self) -> BlockPassName;
    fn run(&self, function: &mut GoFunction) -> Result<usize>;
}

/// Ordered pass pipeline, repeated per function until nothing changes.
pub struct BlockOptimizer {
    passes: Vec<Box<dyn BlockPass>>,
}

impl Default for BlockOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockOptimizer {
    pub fn new() -> Self {
        let mut optimizer = Self { passes: Vec::new() };
        optimizer.register(Box::new(ValidatePass));
        optimizer.register(Box::new(ThreadJumpsPass));
        optimizer.register(Box::new(DropAdjacentGotosPass));
        optimizer.register(Box::new(DropDeadLabelsPass));
        optimizer.register(Box::new(DropUnreachablePass));
        optimizer.register(Box::new(MergeFallthroughPass));
        optimizer
    }

    pub fn register(&mut self, pass: Box<dyn BlockPass>) {
        self.passes.push(pass);
    }

    pub fn run(&self, unit: &mut GoUnit) -> Result<OptimizationReport> {
        let mut report = OptimizationReport::default();
        for function in unit.functions_mut() {
            self.run_function(function, &mut report)
                .map_err(|err| match err {
                    Error::Optimize(message) => {
                        optimization_error(format!("{}: {message}", function.name))
                    }
                    other => other,
                })?;
        }
        debug!(
            "{} {} changes in {} rounds",
            LOG_AREA, report.total_changes, report.rounds
        );
        Ok(report)
    }

    pub fn run_function(
        &self,
        function: &mut GoFunction,
        report: &mut OptimizationReport,
    ) -> Result<()> {
        for _ in 0..MAX_ROUNDS {
            report.rounds += 1;
            let mut changes = 0;
            for pass in &self.passes {
                let changed = pass.run(function)?;
                *report.per_pass.entry(pass.name()).or_default() += changed;
                changes += changed;
            }
            report.total_changes += changes;
            if changes == 0 {
                return Ok(());
            }
        }
        Err(optimization_error(format!(
            "no fixpoint after {MAX_ROUNDS} rounds"
        )))
    }
}

fn referenced_labels(function: &GoFunction) -> HashSet<String> {
    function
        .blocks
        .iter()
        .flat_map(|block| block.exit.targets())
        .map(str::to_string)
        .collect()
}

/// Labels are unique and every jump names one of them.
struct ValidatePass;

impl BlockPass for ValidatePass {
    fn name(&self) -> BlockPassName {
        BlockPassName::Validate
    }

    fn run(&self, function: &mut GoFunction) -> Result<usize> {
        let mut defined = HashSet::new();
        for label in function.blocks.iter().filter_map(|b| b.label.as_deref()) {
            if !defined.insert(label) {
                return Err(optimization_error(format!("label {label} defined twice")));
            }
        }
        for target in function.blocks.iter().flat_map(|b| b.exit.targets()) {
            if !defined.contains(target) {
                return Err(optimization_error(format!(
                    "jump to undefined label {target}"
                )));
            }
        }
        if function
            .blocks
            .last()
            .map_or(false, |block| block.exit.falls_through())
        {
            return Err(optimization_error("control falls off the end"));
        }
        Ok(0)
    }
}

/// References to an empty block that only jumps on are sent straight to its
/// final destination.
struct ThreadJumpsPass;

impl BlockPass for ThreadJumpsPass {
    fn name(&self) -> BlockPassName {
        BlockPassName::ThreadJumps
    }

    fn run(&self, function: &mut GoFunction) -> Result<usize> {
        let mut forward = HashMap::new();
        for block in &function.blocks {
            if let (Some(label), true, GoExit::Goto(target)) =
                (&block.label, block.statements.is_empty(), &block.exit)
            {
                if label != target {
                    forward.insert(label.clone(), target.clone());
                }
            }
        }
        if forward.is_empty() {
            return Ok(0);
        }

        let mut resolved = HashMap::new();
        for start in forward.keys() {
            let mut seen = HashSet::from([start.as_str()]);
            let mut end = start.as_str();
            let mut cyclic = false;
            while let Some(next) = forward.get(end) {
                if !seen.insert(next.as_str()) {
                    cyclic = true;
                    break;
                }
                end = next.as_str();
            }
            if !cyclic {
                resolved.insert(start.clone(), end.to_string());
            }
        }

        let mut changes = 0;
        for block in &mut function.blocks {
            for (from, to) in &resolved {
                changes += block.exit.retarget(from, to);
            }
        }
        Ok(changes)
    }
}

/// `goto L` directly followed by `L:` falls through instead.
struct DropAdjacentGotosPass;

impl BlockPass for DropAdjacentGotosPass {
    fn name(&self) -> BlockPassName {
        BlockPassName::DropAdjacentGotos
    }

    fn run(&self, function: &mut GoFunction) -> Result<usize> {
        let mut changes = 0;
        for i in 1..function.blocks.len() {
            let jumps_to_next = match (&function.blocks[i - 1].exit, &function.blocks[i].label) {
                (GoExit::Goto(target), Some(next)) => target == next,
                _ => false,
            };
            if jumps_to_next {
                function.blocks[i - 1].exit = GoExit::Fallthrough;
                changes += 1;
            }
        }
        Ok(changes)
    }
}

struct DropDeadLabelsPass;

impl BlockPass for DropDeadLabelsPass {
    fn name(&self) -> BlockPassName {
        BlockPassName::DropDeadLabels
    }

    fn run(&self, function: &mut GoFunction) -> Result<usize> {
        let live = referenced_labels(function);
        let mut changes = 0;
        for block in &mut function.blocks {
            if block.label.as_ref().is_some_and(|label| !live.contains(label)) {
                block.label = None;
                changes += 1;
            }
        }
        Ok(changes)
    }
}

/// An unlabeled block after one that cannot fall through is never entered.
struct DropUnreachablePass;

impl BlockPass for DropUnreachablePass {
    fn name(&self) -> BlockPassName {
        BlockPassName::DropUnreachable
    }

    fn run(&self, function: &mut GoFunction) -> Result<usize> {
        let before = function.blocks.len();
        let mut kept: Vec<GoBlock> = Vec::with_capacity(before);
        for block in function.blocks.drain(..) {
            let unreachable = block.label.is_none()
                && kept.last().is_some_and(|prev| !prev.exit.falls_through());
            if !unreachable {
                kept.push(block);
            }
        }
        function.blocks = kept;
        Ok(before - function.blocks.len())
    }
}

/// An unlabeled block entered only by falling through from a straight-line
/// predecessor joins that predecessor. Empty unlabeled fall-through blocks
/// vanish.
struct MergeFallthroughPass;

impl BlockPass for MergeFallthroughPass {
    fn name(&self) -> BlockPassName {
        BlockPassName::MergeFallthrough
    }

    fn run(&self, function: &mut GoFunction) -> Result<usize> {
        let before = function.blocks.len();
        let mut merged: Vec<GoBlock> = Vec::with_capacity(before);
        for mut block in function.blocks.drain(..) {
            match merged.last_mut() {
                Some(prev) if block.label.is_none() && prev.exit == GoExit::Fallthrough => {
                    prev.statements.append(&mut block.statements);
                    prev.exit = block.exit;
                }
                Some(prev)
                    if prev.label.is_none()
                        && prev.statements.is_empty()
                        && prev.exit == GoExit::Fallthrough =>
                {
                    *prev = block;
                }
                _ => merged.push(block),
            }
        }
        function.blocks = merged;
        Ok(before - function.blocks.len())
    }
}
