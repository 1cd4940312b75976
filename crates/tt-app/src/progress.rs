#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    LoadingScenario,
    CheckingCache,
    LoadingCachedResult,
    Simulating,
    Tuning,
    SavingResults,
    Completed,
}

#[derive(Debug, Clone, Default)]
pub struct SimProgress {
    pub sim_time_s: f64,
    pub t_end_s: f64,
    pub fraction_complete: f64,
    pub step: usize,
}

#[derive(Debug, Clone)]
pub struct RunProgressEvent {
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
    pub sim: Option<SimProgress>,
}

impl RunProgressEvent {
    pub fn stage(stage: RunStage, elapsed_wall_s: f64, message: Option<String>) -> Self {
        Self {
            stage,
            elapsed_wall_s,
            message,
            sim: None,
        }
    }
}

pub(crate) type ProgressCallback<'a> = Option<&'a mut dyn FnMut(RunProgressEvent)>;

pub(crate) fn emit(
    progress_cb: &mut ProgressCallback<'_>,
    stage: RunStage,
    started: std::time::Instant,
    message: &str,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent::stage(
            stage,
            started.elapsed().as_secs_f64(),
            Some(message.to_string()),
        ));
    }
}

pub(crate) fn emit_sim(
    progress_cb: &mut ProgressCallback<'_>,
    stage: RunStage,
    started: std::time::Instant,
    sim: SimProgress,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent {
            stage,
            elapsed_wall_s: started.elapsed().as_secs_f64(),
            message: None,
            sim: Some(sim),
        });
    }
}

impl RunStage {
    pub fn label(self) -> &'static str {
        match self {
            RunStage::LoadingScenario => "loading",
            RunStage::CheckingCache => "cache",
            RunStage::LoadingCachedResult => "cached",
            RunStage::Simulating => "simulating",
            RunStage::Tuning => "tuning",
            RunStage::SavingResults => "saving",
            RunStage::Completed => "done",
        }
    }
}
