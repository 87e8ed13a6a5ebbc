use crate::edges::{BorderFill, GradientMethod};
use crate::lanes::LaneKind;
use crate::luma::LumaMethod;
use crate::pipeline::{
    FrameSink, FrameSource, ImageFileSource, NullSink, PerfModel, PipelineOptions,
    PngSequenceSink, SyntheticPattern, SyntheticSource,
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Where frames come from.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    Synthetic {
        #[serde(default)]
        pattern: SyntheticPattern,
    },
    Files {
        #[serde(default)]
        paths: Vec<PathBuf>,
        dir: Option<PathBuf>,
    },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Synthetic {
            pattern: SyntheticPattern::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub report_csv: PathBuf,
    pub report_json: Option<PathBuf>,
    /// Directory receiving one PNG per processed frame.
    pub frames_dir: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            report_csv: PathBuf::from("mt_perf.csv"),
            report_json: None,
            frames_dir: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub source: SourceConfig,
    /// 0 runs until the source is exhausted.
    pub frames: u64,
    pub width: usize,
    pub height: usize,
    pub luma: LumaMethod,
    pub gradient: GradientMethod,
    pub lanes: LaneKind,
    pub border: BorderFill,
    pub perf: PerfModel,
    pub output: OutputConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            frames: 100,
            width: 640,
            height: 480,
            luma: LumaMethod::default(),
            gradient: GradientMethod::default(),
            lanes: LaneKind::default(),
            border: BorderFill::default(),
            perf: PerfModel::default(),
            output: OutputConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            width: self.width,
            height: self.height,
            luma: self.luma,
            gradient: self.gradient,
            lanes: self.lanes,
            border: self.border,
            max_frames: self.frames,
            perf: self.perf,
        }
    }

    pub fn build_source(&self) -> Result<Box<dyn FrameSource>, String> {
        match &self.source {
            SourceConfig::Synthetic { pattern } => {
                let source = SyntheticSource::new(self.width, self.height, *pattern);
                Ok(Box::new(source))
            }
            SourceConfig::Files { paths, dir } => {
                let source = match dir {
                    Some(dir) => ImageFileSource::from_dir(dir)?,
                    None => ImageFileSource::new(paths.iter().cloned()),
                };
                if source.remaining() == 0 {
                    return Err("File source has no input images".to_string());
                }
                Ok(Box::new(source))
            }
        }
    }

    pub fn build_sink(&self) -> Box<dyn FrameSink> {
        match &self.output.frames_dir {
            Some(dir) => Box::new(PngSequenceSink::new(dir)),
            None => Box::new(NullSink),
        }
    }
}

pub fn load_config(path: &Path) -> Result<RunConfig, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
}
