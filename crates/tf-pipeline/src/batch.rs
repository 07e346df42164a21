//! Batch command builder.
//!
//! Folds an ordered list of [`ConversionPlan`]s into a single ffmpeg
//! invocation so that one process handles every staged file:
//!
//! ```text
//! ffmpeg -y [inputs of plan 0] [inputs of plan 1] ... [outputs of plan 0] [outputs of plan 1] ...
//! ```
//!
//! Input stream indices are allocated from one counter threaded through the
//! plans; a plan takes one slot for its source and one more for a matched
//! subtitle sidecar.

use std::path::PathBuf;
use std::time::Duration;

use tf_av::ToolCommand;

use crate::plan::ConversionPlan;

/// Flags placed before any input; `-y` lets ffmpeg overwrite outputs.
pub const GLOBAL_FLAGS: &[&str] = &["-y"];

/// Input slots a plan received in the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotAssignment {
    pub source_filename: String,
    /// Index of the plan's first input (its source).
    pub first_input: usize,
    /// Number of input slots taken (1, or 2 with a subtitle).
    pub slots: usize,
}

/// One assembled multi-input, multi-output ffmpeg command.
#[derive(Debug, Clone, Default)]
pub struct BatchCommand {
    inputs: Vec<String>,
    outputs: Vec<String>,
    next_input_index: usize,
    assignments: Vec<SlotAssignment>,
}

impl BatchCommand {
    /// Build the command for `plans`, in order.
    ///
    /// Plans that skip existing outputs and are already satisfied are left
    /// out entirely. Any plan error aborts the build so that no partial
    /// command is ever issued.
    pub fn build(plans: &[ConversionPlan]) -> tf_core::Result<Self> {
        let mut batch = Self::default();
        for plan in plans {
            if plan.skip_if_output_exists() && plan.is_already_satisfied()? {
                tracing::debug!(file = %plan.source_filename(), "Outputs already exist; skipping");
                continue;
            }
            tracing::debug!(file = %plan.source_filename(), remux = plan.remux_only(), "Adding to batch");
            batch.add(plan)?;
        }
        Ok(batch)
    }

    /// Append one plan, allocating its input slots.
    pub fn add(&mut self, plan: &ConversionPlan) -> tf_core::Result<&SlotAssignment> {
        let first_input = self.next_input_index;
        self.next_input_index =
            plan.contribute_to_command(&mut self.inputs, &mut self.outputs, first_input)?;
        self.assignments.push(SlotAssignment {
            source_filename: plan.source_filename().to_string(),
            first_input,
            slots: self.next_input_index - first_input,
        });
        Ok(&self.assignments[self.assignments.len() - 1])
    }

    /// `true` when no plan contributed an output; such a command must not run.
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Number of input slots allocated so far.
    pub fn input_count(&self) -> usize {
        self.next_input_index
    }

    /// Number of output files the command writes.
    ///
    /// Every output group ends in its destination path, the only argument
    /// that is neither a flag nor a flag's value.
    pub fn output_count(&self) -> usize {
        let mut count = 0;
        let mut args = self.outputs.iter();
        while let Some(arg) = args.next() {
            if arg.starts_with('-') {
                args.next();
            } else {
                count += 1;
            }
        }
        count
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// Slot assignments in plan order.
    pub fn assignments(&self) -> &[SlotAssignment] {
        &self.assignments
    }

    /// Global flags, then every input group, then every output group.
    pub fn to_args(&self) -> Vec<String> {
        GLOBAL_FLAGS
            .iter()
            .map(|s| s.to_string())
            .chain(self.inputs.iter().cloned())
            .chain(self.outputs.iter().cloned())
            .collect()
    }

    /// Wrap the arguments into a runnable [`ToolCommand`].
    pub fn to_tool_command(&self, program: PathBuf, timeout: Duration) -> ToolCommand {
        let mut cmd = ToolCommand::new(program);
        cmd.args(self.to_args()).timeout(timeout);
        cmd
    }
}
