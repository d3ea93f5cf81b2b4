use super::{DrillFrame, PieChartDefinition, PieNode};
use crate::fetch::{Fetching, RequestSlot};
use crate::widget::DataState;

/// The state of one pie chart instance.
pub struct PieChartRecord {
    definition: PieChartDefinition,
    /// The drill-down stack. The root frame is always at the bottom once the data is loaded.
    frames: DataState<Vec<DrillFrame>>,
    requests: RequestSlot,
}

impl PieChartRecord {
    pub fn new(definition: PieChartDefinition) -> Self {
        PieChartRecord {
            definition,
            frames: DataState::Loading,
            requests: RequestSlot::default(),
        }
    }

    pub fn definition(&self) -> &PieChartDefinition {
        &self.definition
    }

    pub fn label(&self) -> &str {
        &self.definition.label
    }

    /// Replaces the drill stack with a single root frame holding the received categories.
    pub fn on_data_received(&mut self, nodes: Vec<PieNode>) {
        self.frames = DataState::Ready(vec![DrillFrame {
            data: nodes,
            label: None,
        }]);
    }

    pub fn on_request_failed(&mut self) {
        self.frames = DataState::Failed;
    }

    /// Returns the categories of the current drill frame.
    pub fn get_data(&self) -> DataState<Vec<PieNode>> {
        self.frames
            .as_ref()
            .map(|frames| frames.last().map(|frame| frame.data.clone()).unwrap_or_default())
    }

    /// Drills into the category at the index of the current frame.
    ///
    /// Returns `false` if there's no such category or it has no children.
    pub fn drill_in(&mut self, index: usize) -> bool {
        let DataState::Ready(frames) = &mut self.frames else {
            return false;
        };
        let Some(node) = frames.last().and_then(|frame| frame.data.get(index)) else {
            return false;
        };
        let Some(children) = node.children.as_ref().filter(|children| !children.is_empty()) else {
            return false;
        };

        let frame = DrillFrame {
            data: children.clone(),
            label: Some(node.breadcrumb()),
        };
        frames.push(frame);
        true
    }

    /// Goes back to the previous frame.
    ///
    /// Returns `false` at the root frame, which is never popped.
    pub fn drill_out(&mut self) -> bool {
        match &mut self.frames {
            DataState::Ready(frames) if frames.len() > 1 => {
                frames.pop();
                true
            }
            _ => false,
        }
    }

    /// Returns the labels of every frame above the root.
    pub fn breadcrumbs(&self) -> Vec<String> {
        match &self.frames {
            DataState::Ready(frames) => frames.iter().filter_map(|frame| frame.label.clone()).collect(),
            _ => Vec::new(),
        }
    }

    /// Returns how many frames were drilled into. Zero at the root.
    pub fn drill_depth(&self) -> usize {
        self.frames.ready().map_or(0, |frames| frames.len().saturating_sub(1))
    }
}

impl Fetching for PieChartRecord {
    fn requests(&mut self) -> &mut RequestSlot {
        &mut self.requests
    }
}
