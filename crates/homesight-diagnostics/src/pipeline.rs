//! Inbound facade over the diagnostic pipeline.
//!
//! The rest of the application consumes three operations: intent
//! classification, the diagnostic workflow, and device search. This type
//! wires the components together once and exposes exactly those.

use std::sync::Arc;

use homesight_core::Result;
use homesight_index::{DeviceSearchResult, SearchOptions, SemanticDeviceIndex};
use homesight_intent::{IntentClassification, IntentClassifier};

use crate::context::DiagnosticReport;
use crate::workflow::DiagnosticWorkflow;

/// Classifier + workflow + index behind one handle.
pub struct DiagnosticPipeline {
    classifier: Arc<IntentClassifier>,
    workflow: DiagnosticWorkflow,
    index: Arc<SemanticDeviceIndex>,
}

impl DiagnosticPipeline {
    pub fn new(
        classifier: Arc<IntentClassifier>,
        workflow: DiagnosticWorkflow,
        index: Arc<SemanticDeviceIndex>,
    ) -> Self {
        Self {
            classifier,
            workflow,
            index,
        }
    }

    /// Classify one user message.
    pub async fn classify_intent(
        &self,
        message: &str,
        context: Option<&[String]>,
    ) -> IntentClassification {
        self.classifier.classify_intent(message, context).await
    }

    /// Run the diagnostic workflow for an existing classification.
    pub async fn execute_diagnostic_workflow(
        &self,
        classification: &IntentClassification,
        user_message: &str,
    ) -> DiagnosticReport {
        self.workflow
            .execute_diagnostic_workflow(classification, user_message)
            .await
    }

    /// Classify and, when diagnostics are called for, run the workflow in
    /// one step.
    pub async fn diagnose(
        &self,
        message: &str,
        context: Option<&[String]>,
    ) -> (IntentClassification, DiagnosticReport) {
        let classification = self.classify_intent(message, context).await;
        let report = self
            .execute_diagnostic_workflow(&classification, message)
            .await;
        (classification, report)
    }

    /// Natural-language device search.
    pub async fn search_devices(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<Vec<DeviceSearchResult>> {
        self.index.search_devices(query, options).await
    }
}
