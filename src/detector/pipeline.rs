//! The detection pipeline: dispatch, collection, aggregation, refinement.
//!
//! One [`StructureDetector::detect`] call runs these stages:
//! 1. Dispatching – validate the patch, order the enabled features by
//!    descending weight, cap them at `max_modules`, build one configured
//!    module per feature and spawn the jobs onto a dedicated pool.
//! 2. Collecting – receive completions as they arrive, feeding a streaming
//!    aggregator; a shared deadline bounds the wait and the early-decision
//!    gate can cut it short. Missing modules are folded in as invalid.
//! 3. Aggregating – one batch pass over the full result map.
//! 4. Refining – only for an ambiguous outcome: a recentering round, then
//!    decisiveness-reweighting rounds, bounded by `max_refinement_attempts`.
//!
//! Construction validates the profile and dry-runs every enabled module's
//! configuration, so a `StructureDetector` that exists cannot fail a call
//! over its own settings; per-call failures reduce to invalid results.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, warn};
use serde::Serialize;

use crate::aggregate::{
    aggregate, is_ambiguous, refinement_candidates, AggregationResult, StreamingAggregator,
};
use crate::diagnostics::{DetectionPhase, ProgressEvent, TimingBreakdown};
use crate::features::{FeatureKind, FeatureModule, FeatureRegistry, FeatureResult};
use crate::profile::{DetectorProfile, FeatureSettings, PatchShape, StructureType};
use crate::raster::ElevationPatch;

use super::dispatch::{compute_guarded, dispatch_modules, ModuleJob};
use super::options::{CancelToken, DetectOptions};
use super::refine::{recenter_patch, reweighted_profile, round_improves};
use super::DetectError;

/// The prior every decision starts from before evidence moves it.
const BASE_SCORE: f32 = 0.5;

/// Run-level facts attached to every [`DetectionResult`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionMetadata {
    pub profile_name: String,
    pub structure_type: StructureType,
    /// Modules this call planned to run: enabled, capped by `max_modules`.
    pub modules_planned: usize,
    /// Modules that produced a valid result.
    pub modules_valid: usize,
    pub detection_threshold: f32,
    pub confidence_threshold: f32,
    /// Collection was cut short by the early-decision gate.
    pub early_decision: bool,
    pub timing: TimingBreakdown,
}

/// Final outcome of one detection call.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    /// Whether `final_score` reached the detection threshold (inclusive).
    pub detected: bool,
    /// Coverage-scaled decisiveness of the deciding pass, in [0, 1].
    pub confidence: f32,
    /// Blended decision score of the deciding pass, in [0, 1].
    pub final_score: f32,
    /// The neutral prior the blend starts from.
    pub base_score: f32,
    /// Every module's result, valid or not, keyed by module name.
    pub feature_results: BTreeMap<String, FeatureResult>,
    /// Refinement rounds actually run.
    pub refinement_attempts: u32,
    /// Aggregation outcome of every refinement round, in order.
    pub refinement_history: Vec<AggregationResult>,
    /// Human-readable decision summary.
    pub reason: String,
    pub metadata: DetectionMetadata,
}

/// Ensemble detector for man-made structures in elevation patches.
///
/// Holds a validated profile and the module registry; every call is
/// otherwise stateless, so one detector can serve concurrent calls.
#[derive(Debug)]
pub struct StructureDetector {
    profile: DetectorProfile,
    registry: FeatureRegistry,
}

impl StructureDetector {
    /// Detector over the stock module registry.
    ///
    /// Fails with the full list of profile issues when the profile is
    /// semantically unsound or any enabled feature rejects its parameters.
    pub fn new(profile: DetectorProfile) -> Result<Self, Vec<String>> {
        Self::with_registry(profile, FeatureRegistry::default())
    }

    /// Detector over a caller-supplied registry (tests swap factories to
    /// inject slow or failing modules).
    pub fn with_registry(
        profile: DetectorProfile,
        registry: FeatureRegistry,
    ) -> Result<Self, Vec<String>> {
        let mut issues = profile.validate();
        if issues.is_empty() {
            // Dry-run each enabled module's configuration so parameter
            // errors surface here instead of inside a detection call.
            for (kind, settings) in profile.enabled_features() {
                match registry.build(kind) {
                    Some(mut module) => {
                        module.set_geometry(
                            profile.geometry.resolution_m,
                            profile.geometry.radius_px(),
                        );
                        if let Err(issue) = module.configure(&settings.parameters) {
                            issues.push(issue);
                        }
                    }
                    None => issues.push(format!("no module registered for feature `{kind}`")),
                }
            }
        }
        if issues.is_empty() {
            Ok(Self { profile, registry })
        } else {
            Err(issues)
        }
    }

    pub fn profile(&self) -> &DetectorProfile {
        &self.profile
    }

    /// Detect with default options: 30 s collection deadline, no early stop.
    pub fn detect(&self, patch: &ElevationPatch) -> Result<DetectionResult, DetectError> {
        self.run(patch, &DetectOptions::default(), None)
    }

    /// Detect with explicit runtime options.
    pub fn detect_with_options(
        &self,
        patch: &ElevationPatch,
        options: &DetectOptions,
    ) -> Result<DetectionResult, DetectError> {
        self.run(patch, options, None)
    }

    /// Detect while reporting every integrated module result through
    /// `on_progress`. The final result is identical to the batch call's.
    pub fn detect_streaming(
        &self,
        patch: &ElevationPatch,
        options: &DetectOptions,
        on_progress: &mut dyn FnMut(ProgressEvent),
    ) -> Result<DetectionResult, DetectError> {
        self.run(patch, options, Some(on_progress))
    }

    fn run(
        &self,
        patch: &ElevationPatch,
        options: &DetectOptions,
        mut progress: Option<&mut dyn FnMut(ProgressEvent)>,
    ) -> Result<DetectionResult, DetectError> {
        let total_start = Instant::now();
        if let Some(issue) = patch_issue(patch) {
            return Err(DetectError::InvalidPatch(issue));
        }
        self.warn_on_shape_mismatch(patch);

        let dispatch_start = Instant::now();
        let (w, h) = patch.dims();
        let radius_px = self.profile.geometry.structure_radius_m / patch.resolution_m;
        let plan = self.plan();
        debug!(
            "StructureDetector::detect start {}x{} res={:.2} m, {} feature(s), radius {:.1} px",
            w,
            h,
            patch.resolution_m,
            plan.len(),
            radius_px
        );

        let mut jobs: Vec<ModuleJob> = Vec::with_capacity(plan.len());
        let mut preconfigured_failures: Vec<(FeatureKind, FeatureResult)> = Vec::new();
        for (kind, settings) in &plan {
            match self.build_module(*kind, settings, patch.resolution_m, radius_px) {
                Ok(module) => jobs.push(ModuleJob {
                    kind: *kind,
                    module,
                }),
                Err(issue) => {
                    warn!("StructureDetector: feature {kind} failed to configure: {issue}");
                    preconfigured_failures.push((*kind, FeatureResult::invalid(issue)));
                }
            }
        }
        let planned_count = jobs.len() + preconfigured_failures.len();
        if planned_count == 0 {
            return Err(DetectError::NoEvidence);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.profile.max_workers.max(1))
            .build()
            .map_err(|e| DetectError::WorkerPool(e.to_string()))?;
        let worker_cancel = CancelToken::new();
        let mut outstanding: BTreeSet<FeatureKind> = jobs.iter().map(|j| j.kind).collect();
        let rx = dispatch_modules(&pool, jobs, Arc::new(patch.clone()), worker_cancel.clone());
        let dispatch_ms = dispatch_start.elapsed().as_secs_f64() * 1e3;

        let collect_start = Instant::now();
        let deadline = collect_start + options.module_timeout;
        let mut streaming = StreamingAggregator::with_expected(&self.profile, planned_count);
        for (kind, result) in preconfigured_failures {
            streaming.push(kind, result);
        }
        let mut early_stop = false;
        while streaming.completed() < planned_count {
            if options.cancel.is_cancelled() {
                warn!(
                    "StructureDetector: cancelled by caller with {} module(s) outstanding",
                    outstanding.len()
                );
                worker_cancel.cancel();
                fail_outstanding(&mut streaming, &mut outstanding, "cancelled by caller");
                break;
            }
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                warn!(
                    "StructureDetector: {} module(s) missed the {:.1} s deadline",
                    outstanding.len(),
                    options.module_timeout.as_secs_f64()
                );
                worker_cancel.cancel();
                let reason =
                    format!("timed out after {:.1} s", options.module_timeout.as_secs_f64());
                fail_outstanding(&mut streaming, &mut outstanding, &reason);
                break;
            };
            match rx.recv_timeout(remaining) {
                Ok(completion) => {
                    outstanding.remove(&completion.kind);
                    debug!(
                        "StructureDetector: {} finished in {:.3} ms valid={} score={:.3}",
                        completion.kind,
                        completion.elapsed_ms,
                        completion.result.valid,
                        completion.result.score
                    );
                    let snapshot = streaming.push(completion.kind, completion.result.clone());
                    if let Some(cb) = progress.as_mut() {
                        cb(ProgressEvent {
                            module: completion.kind.as_str().to_string(),
                            result: completion.result,
                            streaming: snapshot.clone(),
                            phase: DetectionPhase::Collecting,
                        });
                    }
                    if options.stop_on_early_decision
                        && snapshot.early_decision_possible
                        && !outstanding.is_empty()
                    {
                        debug!(
                            "StructureDetector: early decision after {}/{} module(s), score={:.3}",
                            streaming.completed(),
                            planned_count,
                            snapshot.aggregation.final_score
                        );
                        worker_cancel.cancel();
                        fail_outstanding(
                            &mut streaming,
                            &mut outstanding,
                            "superseded by early decision",
                        );
                        early_stop = true;
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    // Every sender is gone; anything still outstanding will
                    // never report.
                    fail_outstanding(&mut streaming, &mut outstanding, "module never reported");
                    break;
                }
            }
        }
        let collect_ms = collect_start.elapsed().as_secs_f64() * 1e3;
        let results = streaming.into_results();

        let aggregate_start = Instant::now();
        let first = aggregate(&results, &self.profile).map_err(|_| DetectError::NoEvidence)?;
        let aggregate_ms = aggregate_start.elapsed().as_secs_f64() * 1e3;
        debug!(
            "StructureDetector: aggregate score={:.3} confidence={:.3} ({})",
            first.final_score, first.confidence, first.reason
        );

        let refine_start = Instant::now();
        let mut history: Vec<AggregationResult> = Vec::new();
        let mut attempts = 0u32;
        let needs_refinement = self.profile.enable_refinement
            && self.profile.max_refinement_attempts > 0
            && is_ambiguous(&first, &self.profile.thresholds);
        let (decision, evidence) = if needs_refinement {
            debug!(
                "StructureDetector: ambiguous pass (score={:.3} confidence={:.3}), refining",
                first.final_score, first.confidence
            );
            self.refine_ambiguous(patch, radius_px, &first, results, &mut history, &mut attempts)
        } else {
            (first, results)
        };
        let refine_ms = refine_start.elapsed().as_secs_f64() * 1e3;

        let thresholds = &self.profile.thresholds;
        let detected = decision.final_score >= thresholds.detection_threshold;
        let valid_count = evidence.values().filter(|r| r.valid).count();
        let total_ms = total_start.elapsed().as_secs_f64() * 1e3;

        let mut timing = TimingBreakdown {
            total_ms,
            stages: Vec::new(),
        };
        timing.push(DetectionPhase::Dispatching.as_str(), dispatch_ms);
        timing.push(DetectionPhase::Collecting.as_str(), collect_ms);
        timing.push(DetectionPhase::Aggregating.as_str(), aggregate_ms);
        if attempts > 0 {
            timing.push(DetectionPhase::Refining.as_str(), refine_ms);
        }

        debug!(
            "StructureDetector::detect done detected={} score={:.3} confidence={:.3} in {:.3} ms",
            detected, decision.final_score, decision.confidence, total_ms
        );

        Ok(DetectionResult {
            detected,
            confidence: decision.confidence,
            final_score: decision.final_score,
            base_score: BASE_SCORE,
            feature_results: evidence
                .into_iter()
                .map(|(kind, result)| (kind.as_str().to_string(), result))
                .collect(),
            refinement_attempts: attempts,
            refinement_history: history,
            reason: decision_reason(
                detected,
                decision.final_score,
                thresholds.detection_threshold,
                &decision.reason,
            ),
            metadata: DetectionMetadata {
                profile_name: self.profile.name.clone(),
                structure_type: self.profile.structure_type,
                modules_planned: planned_count,
                modules_valid: valid_count,
                detection_threshold: thresholds.detection_threshold,
                confidence_threshold: thresholds.confidence_threshold,
                early_decision: early_stop,
                timing,
            },
        })
    }

    /// Enabled features by descending weight (kind order breaks ties),
    /// truncated to the profile's module cap.
    fn plan(&self) -> Vec<(FeatureKind, &FeatureSettings)> {
        let mut plan: Vec<(FeatureKind, &FeatureSettings)> =
            self.profile.enabled_features().collect();
        plan.sort_by(|a, b| b.1.weight.total_cmp(&a.1.weight).then(a.0.cmp(&b.0)));
        plan.truncate(self.profile.thresholds.max_modules);
        plan
    }

    fn build_module(
        &self,
        kind: FeatureKind,
        settings: &FeatureSettings,
        resolution_m: f32,
        radius_px: f32,
    ) -> Result<Box<dyn FeatureModule>, String> {
        let mut module = self
            .registry
            .build(kind)
            .ok_or_else(|| format!("no module registered for feature `{kind}`"))?;
        module.set_geometry(resolution_m, radius_px);
        module.configure(&settings.parameters)?;
        Ok(module)
    }

    /// Bounded refinement rounds over an ambiguous first pass.
    ///
    /// Round 1 recenters the patch on its dominant peak and recomputes the
    /// weakest evidence on the recentred view; when recentering is a no-op,
    /// and on every later round, the feature weights are rescaled by module
    /// decisiveness instead. A round that escapes the ambiguous band or
    /// clearly beats the best confidence ends the loop; otherwise the
    /// best-confidence outcome seen so far (the first pass included) wins.
    fn refine_ambiguous(
        &self,
        patch: &ElevationPatch,
        radius_px: f32,
        first: &AggregationResult,
        results: BTreeMap<FeatureKind, FeatureResult>,
        history: &mut Vec<AggregationResult>,
        attempts: &mut u32,
    ) -> (AggregationResult, BTreeMap<FeatureKind, FeatureResult>) {
        let limit = self.plan().len().div_ceil(2).max(1);
        let mut best = (first.clone(), results.clone());
        let mut working_results = results;
        let mut working_profile = self.profile.clone();

        for attempt in 1..=self.profile.max_refinement_attempts {
            *attempts = attempt;
            let recentred = if attempt == 1 {
                recenter_patch(patch, radius_px)
            } else {
                None
            };
            match recentred {
                Some(view) => {
                    let targets = refinement_candidates(&working_results, &self.profile, limit);
                    debug!(
                        "StructureDetector: refinement round {attempt} recomputing {targets:?} on recentred view"
                    );
                    for (kind, result) in self.recompute_features(&view, &targets, radius_px) {
                        working_results.insert(kind, result);
                    }
                }
                None => {
                    debug!(
                        "StructureDetector: refinement round {attempt} reweighting by decisiveness"
                    );
                    working_profile = reweighted_profile(&working_profile, &working_results);
                }
            }
            let Ok(candidate) = aggregate(&working_results, &working_profile) else {
                break;
            };
            history.push(candidate.clone());
            debug!(
                "StructureDetector: refinement round {attempt} score={:.3} confidence={:.3}",
                candidate.final_score, candidate.confidence
            );
            if round_improves(&candidate, &best.0, &self.profile) {
                best = (candidate, working_results.clone());
                break;
            }
            if candidate.confidence > best.0.confidence {
                best = (candidate, working_results.clone());
            }
        }
        best
    }

    /// Serially recompute a handful of features on a (usually recentred)
    /// view of the patch.
    fn recompute_features(
        &self,
        patch: &ElevationPatch,
        kinds: &[FeatureKind],
        radius_px: f32,
    ) -> Vec<(FeatureKind, FeatureResult)> {
        let mut out = Vec::with_capacity(kinds.len());
        for &kind in kinds {
            let Some(settings) = self.profile.features.get(&kind) else {
                continue;
            };
            let result = match self.build_module(kind, settings, patch.resolution_m, radius_px) {
                Ok(module) => compute_guarded(kind, module.as_ref(), patch),
                Err(issue) => FeatureResult::invalid(issue),
            };
            out.push((kind, result));
        }
        out
    }

    fn warn_on_shape_mismatch(&self, patch: &ElevationPatch) {
        let geometry = &self.profile.geometry;
        if !matches!(geometry.patch_shape, PatchShape::Square | PatchShape::Circle) {
            return;
        }
        let Some(aspect) = patch.aspect_ratio() else {
            return;
        };
        if (aspect - 1.0).abs() > geometry.aspect_ratio_tolerance {
            warn!(
                "StructureDetector: patch aspect {:.2} outside tolerance {:.2} for a {:?} profile",
                aspect, geometry.aspect_ratio_tolerance, geometry.patch_shape
            );
        }
    }
}

/// Why a patch cannot be scored at all, if any.
fn patch_issue(patch: &ElevationPatch) -> Option<String> {
    if patch.elevation.is_empty() {
        return Some("empty elevation raster".to_string());
    }
    if !(patch.resolution_m.is_finite() && patch.resolution_m > 0.0) {
        return Some(format!("non-positive resolution {}", patch.resolution_m));
    }
    if !patch.elevation.all_finite() {
        return Some("raster contains non-finite cells".to_string());
    }
    None
}

fn fail_outstanding(
    streaming: &mut StreamingAggregator<'_>,
    outstanding: &mut BTreeSet<FeatureKind>,
    reason: &str,
) {
    for kind in std::mem::take(outstanding) {
        streaming.push(kind, FeatureResult::invalid(reason));
    }
}

fn decision_reason(detected: bool, score: f32, threshold: f32, aggregation: &str) -> String {
    if detected {
        format!(
            "structure detected: score {score:.3} at or above threshold {threshold:.3} ({aggregation})"
        )
    } else {
        format!("no structure: score {score:.3} below threshold {threshold:.3} ({aggregation})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureParams, ParamValue, Polarity};
    use crate::raster::HeightGrid;
    use crate::synthetic::{dome_patch, flat_patch};
    use std::time::Duration;

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    struct FixedModule {
        score: f32,
        polarity: Polarity,
    }

    impl FeatureModule for FixedModule {
        fn name(&self) -> &'static str {
            "fixed"
        }
        fn set_geometry(&mut self, _resolution_m: f32, _structure_radius_px: f32) {}
        fn configure(&mut self, _params: &FeatureParams) -> Result<(), String> {
            Ok(())
        }
        fn compute(&self, _grid: &HeightGrid) -> FeatureResult {
            FeatureResult::scored(self.score, self.polarity)
        }
    }

    struct SlowModule {
        delay: Duration,
    }

    impl FeatureModule for SlowModule {
        fn name(&self) -> &'static str {
            "slow"
        }
        fn set_geometry(&mut self, _resolution_m: f32, _structure_radius_px: f32) {}
        fn configure(&mut self, _params: &FeatureParams) -> Result<(), String> {
            Ok(())
        }
        fn compute(&self, _grid: &HeightGrid) -> FeatureResult {
            std::thread::sleep(self.delay);
            FeatureResult::scored(0.9, Polarity::Positive)
        }
    }

    /// Three-feature profile for early-decision scenarios: two heavy fast
    /// supports and one light straggler.
    fn trio_profile() -> DetectorProfile {
        let mut profile = DetectorProfile::default();
        for settings in profile.features.values_mut() {
            settings.enabled = false;
        }
        for kind in [
            FeatureKind::Histogram,
            FeatureKind::Volume,
            FeatureKind::Planarity,
        ] {
            profile.features.get_mut(&kind).unwrap().enabled = true;
        }
        profile.thresholds.min_modules_for_decision = 2;
        profile.enable_refinement = false;
        profile
    }

    #[test]
    fn construction_rejects_invalid_profile() {
        let mut profile = DetectorProfile::default();
        for settings in profile.features.values_mut() {
            settings.enabled = false;
        }
        let issues = StructureDetector::new(profile).unwrap_err();
        assert!(
            issues.iter().any(|i| i.contains("at least one feature")),
            "{issues:?}"
        );
    }

    #[test]
    fn construction_rejects_unknown_feature_parameter() {
        let mut profile = DetectorProfile::default();
        profile
            .features
            .get_mut(&FeatureKind::Volume)
            .unwrap()
            .parameters
            .insert("bogus".to_string(), ParamValue::Num(1.0));
        let issues = StructureDetector::new(profile).unwrap_err();
        assert!(issues.iter().any(|i| i.contains("bogus")), "{issues:?}");
    }

    #[test]
    fn ill_formed_patch_is_refused() {
        let detector = StructureDetector::new(DetectorProfile::default()).unwrap();
        let mut patch = flat_patch(16, 1.0, 1.0);
        patch.elevation.set(3, 3, f32::NAN);
        let err = detector.detect(&patch).unwrap_err();
        assert!(matches!(err, DetectError::InvalidPatch(_)), "{err}");
    }

    #[test]
    fn dome_patch_is_detected() {
        init_logs();
        let detector = StructureDetector::new(DetectorProfile::default()).unwrap();
        let result = detector
            .detect(&dome_patch(41, 8.0, 2.5, 1.0))
            .expect("detection runs");
        assert!(result.detected, "{}", result.reason);
        assert!(result.confidence > 0.0);
        assert_eq!(result.base_score, 0.5);
        assert_eq!(result.feature_results.len(), 6);
        assert!(
            result.feature_results.values().all(|r| r.valid),
            "{:#?}",
            result.feature_results
        );
        assert_eq!(result.refinement_attempts, 0);
        assert_eq!(result.metadata.modules_planned, 6);
        assert_eq!(result.metadata.modules_valid, 6);
        assert!(result.metadata.timing.stage_ms("collecting").is_some());
    }

    #[test]
    fn flat_patch_is_not_detected() {
        init_logs();
        let detector = StructureDetector::new(DetectorProfile::default()).unwrap();
        let result = detector.detect(&flat_patch(41, 120.0, 1.0)).unwrap();
        assert!(!result.detected, "{}", result.reason);
        let histogram = &result.feature_results["histogram"];
        assert!(!histogram.valid, "flat ground cannot bin: {histogram:?}");
    }

    #[test]
    fn max_modules_caps_the_dispatch_plan() {
        let mut profile = DetectorProfile::default();
        profile.thresholds.max_modules = 2;
        profile.thresholds.min_modules_for_decision = 2;
        let detector = StructureDetector::new(profile).unwrap();
        let result = detector.detect(&dome_patch(33, 8.0, 2.0, 1.0)).unwrap();
        // The two heaviest features survive the cap.
        assert_eq!(result.feature_results.len(), 2);
        assert!(result.feature_results.contains_key("histogram"));
        assert!(result.feature_results.contains_key("volume"));
        assert_eq!(result.metadata.modules_planned, 2);
    }

    #[test]
    fn streaming_matches_batch_and_counts_progress() {
        let detector = StructureDetector::new(DetectorProfile::default()).unwrap();
        let patch = dome_patch(41, 8.0, 2.5, 1.0);
        let batch = detector.detect(&patch).unwrap();

        let mut events: Vec<ProgressEvent> = Vec::new();
        let streamed = detector
            .detect_streaming(&patch, &DetectOptions::default(), &mut |event| {
                events.push(event)
            })
            .unwrap();

        assert_eq!(events.len(), 6);
        assert!(events.iter().all(|e| e.phase == DetectionPhase::Collecting));
        let last = events.last().unwrap();
        assert_eq!(last.streaming.completion_percentage, 100.0);
        // The gate never opens before the module floor.
        for (i, event) in events.iter().enumerate() {
            if event.streaming.early_decision_possible {
                assert!(i + 1 >= 3, "gate open after only {} completion(s)", i + 1);
            }
        }
        assert_eq!(streamed.final_score, batch.final_score);
        assert_eq!(streamed.confidence, batch.confidence);
        assert_eq!(streamed.detected, batch.detected);
    }

    #[test]
    fn deadline_marks_stragglers_invalid() {
        init_logs();
        let mut registry = FeatureRegistry::default();
        registry.register(FeatureKind::Entropy, || {
            Box::new(SlowModule {
                delay: Duration::from_millis(500),
            })
        });
        let detector =
            StructureDetector::with_registry(DetectorProfile::default(), registry).unwrap();
        let options = DetectOptions::with_timeout(Duration::from_millis(120));
        let result = detector
            .detect_with_options(&dome_patch(33, 8.0, 2.0, 1.0), &options)
            .unwrap();
        let entropy = &result.feature_results["entropy"];
        assert!(!entropy.valid);
        assert!(entropy.reason.contains("timed out"), "{}", entropy.reason);
        assert_eq!(result.metadata.modules_valid, 5);
    }

    #[test]
    fn precancelled_call_reports_cancelled_modules() {
        let detector = StructureDetector::new(DetectorProfile::default()).unwrap();
        let options = DetectOptions::default();
        options.cancel.cancel();
        let result = detector
            .detect_with_options(&flat_patch(16, 0.0, 1.0), &options)
            .unwrap();
        assert!(result.feature_results.values().all(|r| !r.valid));
        assert!(result
            .feature_results
            .values()
            .all(|r| r.reason.contains("cancelled")));
        assert!(!result.detected);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn early_stop_supersedes_outstanding_modules() {
        init_logs();
        let mut registry = FeatureRegistry::default();
        registry.register(FeatureKind::Histogram, || {
            Box::new(FixedModule {
                score: 0.95,
                polarity: Polarity::Positive,
            })
        });
        registry.register(FeatureKind::Volume, || {
            Box::new(FixedModule {
                score: 0.95,
                polarity: Polarity::Positive,
            })
        });
        registry.register(FeatureKind::Planarity, || {
            Box::new(SlowModule {
                delay: Duration::from_millis(400),
            })
        });
        let detector = StructureDetector::with_registry(trio_profile(), registry).unwrap();
        let options = DetectOptions {
            stop_on_early_decision: true,
            ..DetectOptions::default()
        };
        let result = detector
            .detect_with_options(&flat_patch(16, 0.0, 1.0), &options)
            .unwrap();
        assert!(result.metadata.early_decision);
        assert!(result.detected, "{}", result.reason);
        let planarity = &result.feature_results["planarity"];
        assert!(!planarity.valid);
        assert!(
            planarity.reason.contains("superseded"),
            "{}",
            planarity.reason
        );
    }

    #[test]
    fn refinement_rounds_are_bounded() {
        init_logs();
        let mut profile = DetectorProfile::default();
        for settings in profile.features.values_mut() {
            settings.enabled = false;
        }
        for kind in [FeatureKind::Histogram, FeatureKind::Volume] {
            let settings = profile.features.get_mut(&kind).unwrap();
            settings.enabled = true;
            settings.weight = 1.0;
        }
        profile.max_refinement_attempts = 2;
        // Two perfectly contradictory modules: every pass cancels to the
        // prior and stays ambiguous, so refinement must hit its bound.
        let mut registry = FeatureRegistry::default();
        registry.register(FeatureKind::Histogram, || {
            Box::new(FixedModule {
                score: 0.9,
                polarity: Polarity::Positive,
            })
        });
        registry.register(FeatureKind::Volume, || {
            Box::new(FixedModule {
                score: 0.9,
                polarity: Polarity::Negative,
            })
        });
        let detector = StructureDetector::with_registry(profile, registry).unwrap();
        let result = detector.detect(&flat_patch(21, 0.0, 1.0)).unwrap();
        assert_eq!(result.refinement_attempts, 2);
        assert_eq!(result.refinement_history.len(), 2);
        assert!(!result.detected);
        assert!(
            (result.final_score - 0.5).abs() < 1e-6,
            "{}",
            result.final_score
        );
        assert!(result.metadata.timing.stage_ms("refining").is_some());
    }
}
