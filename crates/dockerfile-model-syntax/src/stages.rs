//! Partitioning of a Dockerfile into global arguments and build stages.

use std::ops::Range;

use log::debug;

use crate::{
    construct::Construct,
    instruction::{ArgInstruction, FromInstruction, Instruction},
};

/// Item ranges of the global section and of every stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StageLayout {
    /// Items before the first `FROM`.
    pub global: Range<usize>,
    /// One range per stage, each starting at its `FROM`.
    pub stages: Vec<Range<usize>>,
}

enum State {
    BeforeFirstStage,
    InStage { start: usize },
}

fn is_from(item: &Construct) -> bool {
    matches!(item, Construct::Instruction(Instruction::From(_)))
}

/// Split `items` at every `FROM` instruction.
pub(crate) fn layout(items: &[Construct]) -> StageLayout {
    let mut state = State::BeforeFirstStage;
    let mut global = 0..items.len();
    let mut stages = Vec::new();

    for (index, item) in items.iter().enumerate() {
        if !is_from(item) {
            continue;
        }
        state = match state {
            State::BeforeFirstStage => {
                global = 0..index;
                State::InStage { start: index }
            }
            State::InStage { start } => {
                stages.push(start..index);
                State::InStage { start: index }
            }
        };
    }
    if let State::InStage { start } = state {
        stages.push(start..items.len());
    }

    debug!(stages = stages.len(), global_items = global.len(); "Partitioned build stages");
    StageLayout { global, stages }
}

/// A read-only view of a Dockerfile's stages.
///
/// The view is computed when it is created and borrows the document, so it
/// always reflects the items it was built from.
#[derive(Debug, Clone)]
pub struct StagesView<'a> {
    global_items: &'a [Construct],
    stages: Vec<Stage<'a>>,
}

impl<'a> StagesView<'a> {
    /// Build the view over `items`.
    pub fn new(items: &'a [Construct]) -> Self {
        let layout = layout(items);
        let stages = layout
            .stages
            .into_iter()
            .enumerate()
            .filter_map(|(index, range)| Stage::new(index, &items[range]))
            .collect();
        Self {
            global_items: &items[layout.global],
            stages,
        }
    }

    /// The `ARG` instructions before the first `FROM`.
    pub fn global_args(&self) -> impl Iterator<Item = &'a ArgInstruction> + use<'a> {
        self.global_items
            .iter()
            .filter_map(Construct::as_instruction)
            .filter_map(Instruction::as_arg)
    }

    /// The items before the first `FROM`, including directives, comments
    /// and blank lines.
    pub fn global_items(&self) -> &'a [Construct] {
        self.global_items
    }

    pub fn stages(&self) -> &[Stage<'a>] {
        &self.stages
    }

    /// The stage named `name`, compared case-insensitively.
    pub fn stage(&self, name: &str) -> Option<&Stage<'a>> {
        self.stages.iter().find(|stage| {
            stage
                .name()
                .is_some_and(|stage_name| stage_name.eq_ignore_ascii_case(name))
        })
    }
}

/// One build stage: a `FROM` instruction and the items up to the next one.
#[derive(Debug, Clone)]
pub struct Stage<'a> {
    index: usize,
    from: &'a FromInstruction,
    items: &'a [Construct],
}

impl<'a> Stage<'a> {
    fn new(index: usize, items: &'a [Construct]) -> Option<Self> {
        let from = items.first()?.as_instruction()?.as_from()?;
        Some(Self { index, from, items })
    }

    /// Position of the stage in the document, starting at 0.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn from_instruction(&self) -> &'a FromInstruction {
        self.from
    }

    /// The name given with `AS`.
    pub fn name(&self) -> Option<String> {
        self.from.stage_name()
    }

    /// All items of the stage, starting with its `FROM`.
    pub fn items(&self) -> &'a [Construct] {
        self.items
    }

    /// The instructions of the stage, starting with its `FROM`.
    pub fn instructions(&self) -> impl Iterator<Item = &'a Instruction> + use<'a> {
        self.items.iter().filter_map(Construct::as_instruction)
    }

    /// The stage-scoped `ARG` instructions.
    pub fn args(&self) -> impl Iterator<Item = &'a ArgInstruction> + use<'a> {
        self.instructions().filter_map(Instruction::as_arg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Dockerfile;

    const TEXT: &str = "\
ARG BASE=alpine
# builder
FROM $BASE AS build
RUN make

FROM scratch AS Final
COPY --from=build /out /
";

    #[test]
    fn test_layout() {
        let dockerfile = Dockerfile::parse(TEXT).unwrap();
        let layout = layout(dockerfile.items());
        assert_eq!(layout.global, 0..2);
        assert_eq!(layout.stages, vec![2..5, 5..7]);
    }

    #[test]
    fn test_view() {
        let dockerfile = Dockerfile::parse(TEXT).unwrap();
        let view = dockerfile.stages();

        let globals: Vec<_> = view.global_args().flat_map(ArgInstruction::names).collect();
        assert_eq!(globals, vec!["BASE"]);
        assert_eq!(view.stages().len(), 2);

        let build = &view.stages()[0];
        assert_eq!(build.name().as_deref(), Some("build"));
        assert_eq!(build.from_instruction().image_name(), "$BASE");
        assert_eq!(build.instructions().count(), 2);

        let last = view.stage("final").unwrap();
        assert_eq!(last.index(), 1);
        assert_eq!(last.items().len(), 2);
    }

    #[test]
    fn test_no_stages() {
        let dockerfile = Dockerfile::parse("ARG A\n").unwrap();
        let view = dockerfile.stages();
        assert!(view.stages().is_empty());
        assert_eq!(view.global_args().count(), 1);
    }
}
