use crate::models::TestResults;
use crate::services::metadata::ImageMetadata;
use crate::services::metadata::xmp::{NS_ST_EVT, NS_XMP, NS_XMP_MM};

/// Creator-tool prefix written by Adobe Photoshop
pub const PHOTOSHOP_SIGNATURE: &str = "Adobe Photoshop ";

/// A single independent check over extracted metadata.
///
/// A missing property must yield `false`, never an error.
pub trait Heuristic: Send + Sync {
    /// Key used in the verdict's `tests` object
    fn name(&self) -> &'static str;

    fn evaluate(&self, metadata: &ImageMetadata) -> bool;
}

/// `xmp:CreatorTool` starts with the Photoshop signature.
pub struct CreatorToolIsPhotoshop;

impl Heuristic for CreatorToolIsPhotoshop {
    fn name(&self) -> &'static str {
        "creator_tool_is_photoshop"
    }

    fn evaluate(&self, metadata: &ImageMetadata) -> bool {
        metadata
            .property(NS_XMP, "CreatorTool")
            .is_some_and(|tool| tool.starts_with(PHOTOSHOP_SIGNATURE))
    }
}

/// `xmp:CreateDate` and `xmp:ModifyDate` disagree somewhere between year and
/// second. Fractions of a second and timezone offsets are not compared.
pub struct CreateModifyMismatch;

impl Heuristic for CreateModifyMismatch {
    fn name(&self) -> &'static str {
        "create_modify_mismatch"
    }

    fn evaluate(&self, metadata: &ImageMetadata) -> bool {
        let Some(created) = metadata.date(NS_XMP, "CreateDate") else {
            return false;
        };
        let Some(modified) = metadata.date(NS_XMP, "ModifyDate") else {
            return false;
        };
        !created.same_to_the_second(&modified)
    }
}

/// Some `xmpMM:History` event was written by Photoshop.
pub struct HistoryAgentIsPhotoshop;

impl Heuristic for HistoryAgentIsPhotoshop {
    fn name(&self) -> &'static str {
        "history_agent_is_photoshop"
    }

    fn evaluate(&self, metadata: &ImageMetadata) -> bool {
        metadata
            .array_field_values(NS_XMP_MM, "History", NS_ST_EVT, "softwareAgent")
            .any(|agent| agent.starts_with(PHOTOSHOP_SIGNATURE))
    }
}

/// The image carries an `xmpMM:History` with at least one event.
pub struct HasEditHistory;

impl Heuristic for HasEditHistory {
    fn name(&self) -> &'static str {
        "has_edit_history"
    }

    fn evaluate(&self, metadata: &ImageMetadata) -> bool {
        metadata.array_len(NS_XMP_MM, "History") > 0
    }
}

/// Ordered registry of heuristics. Every registered test runs on every
/// image; results come back in registration order.
#[derive(Default)]
pub struct TestBattery {
    tests: Vec<Box<dyn Heuristic>>,
}

impl TestBattery {
    pub fn new() -> Self {
        Self::default()
    }

    /// The two checks every deployment runs.
    pub fn standard() -> Self {
        Self::new()
            .with(CreatorToolIsPhotoshop)
            .with(CreateModifyMismatch)
    }

    /// Standard checks plus the edit-history ones.
    pub fn extended() -> Self {
        Self::standard()
            .with(HistoryAgentIsPhotoshop)
            .with(HasEditHistory)
    }

    pub fn with<H: Heuristic + 'static>(mut self, heuristic: H) -> Self {
        self.register(Box::new(heuristic));
        self
    }

    pub fn register(&mut self, heuristic: Box<dyn Heuristic>) {
        self.tests.push(heuristic);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tests.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    pub fn run(&self, metadata: &ImageMetadata) -> TestResults {
        let mut results = TestResults::new();
        for test in &self.tests {
            results.push(test.name(), test.evaluate(metadata));
        }
        results
    }
}
