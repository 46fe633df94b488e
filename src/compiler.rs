/*!
 * Compilation driver.
 *
 * Drives the extracted and translated source tree through
 * `DocumentSetExtracted -> MainFileSelected -> TypesettingInjected -> Compiled -> ArtifactRelocated`.
 * The compiler is an external binary; its exit status and the presence of the
 * expected PDF after the final pass are the only success criteria.
 */

use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

use crate::app_config::{CompileConfig, Config};
use crate::errors::CompileError;
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::typesetting;

/// Markers that distinguish a root file from an included fragment
const ROOT_FILE_MARKERS: &[&str] = &[r"\begin{document}", r"\usepackage", r"\title", r"\author"];

/// Stages of a compilation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileStage {
    /// Sources are on disk
    DocumentSetExtracted,
    /// The root file is known
    MainFileSelected,
    /// Font setup has been written into the root file
    TypesettingInjected,
    /// The compiler produced a PDF
    Compiled,
    /// The PDF is at its final location
    ArtifactRelocated,
}

/// Fonts and language used for the typesetting setup
#[derive(Debug, Clone)]
pub struct TypesettingOptions {
    /// Target language as a name or ISO code
    pub target_language: String,
    /// Main font
    pub font_name: String,
    /// Monospace font
    pub mono_font_name: String,
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct CompileOutcome {
    /// Root file that was compiled
    pub main_file: PathBuf,
    /// Final location of the PDF
    pub artifact: PathBuf,
    /// Number of compiler passes executed
    pub passes: u32,
    /// Last stage reached
    pub stage: CompileStage,
}

fn has_documentclass(contents: &str) -> bool {
    contents.lines().any(|line| line.trim_start().starts_with(r"\documentclass"))
}

/// Select the root `.tex` file of a source tree
///
/// Preference order: a file with `\documentclass` and at least one root
/// marker, then a file with `\documentclass` alone, then the largest file.
/// Candidates are considered in path order.
pub fn find_main_tex_file(directory: &Path) -> Result<PathBuf, CompileError> {
    let candidates = FileManager::find_tex_files(directory)
        .map_err(|_| CompileError::MainFileNotFound(directory.to_path_buf()))?;

    let mut class_only: Option<PathBuf> = None;
    let mut largest: Option<(u64, PathBuf)> = None;

    for candidate in &candidates {
        let bytes = match fs::read(candidate) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read {:?}: {}", candidate, e);
                continue;
            }
        };
        let size = bytes.len() as u64;
        let contents = String::from_utf8_lossy(&bytes);

        if has_documentclass(&contents) {
            if ROOT_FILE_MARKERS.iter().any(|marker| contents.contains(marker)) {
                debug!("Main .tex file selected: {:?}", candidate);
                return Ok(candidate.clone());
            }
            if class_only.is_none() {
                class_only = Some(candidate.clone());
            }
        }

        if largest.as_ref().is_none_or(|(largest_size, _)| size > *largest_size) {
            largest = Some((size, candidate.clone()));
        }
    }

    if let Some(path) = class_only {
        debug!("Main .tex file selected by \\documentclass only: {:?}", path);
        return Ok(path);
    }

    match largest {
        Some((_, path)) => {
            debug!("No clear main file found, selected by size: {:?}", path);
            Ok(path)
        },
        None => Err(CompileError::MainFileNotFound(directory.to_path_buf())),
    }
}

/// Drives the external compiler for one paper
#[derive(Debug, Clone)]
pub struct CompilationDriver {
    config: CompileConfig,
    typesetting: TypesettingOptions,
}

impl CompilationDriver {
    /// Create a driver
    pub fn new(config: CompileConfig, typesetting: TypesettingOptions) -> Self {
        Self { config, typesetting }
    }

    /// Create a driver from the application configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.compile.clone(), TypesettingOptions {
            target_language: config.target_language.clone(),
            font_name: config.font_name.clone(),
            mono_font_name: config.mono_font_name.clone(),
        })
    }

    /// Run every stage for the tree in `directory`, placing the PDF at `final_path`
    pub async fn run(&self, directory: &Path, final_path: &Path) -> Result<CompileOutcome, CompileError> {
        let mut stage = CompileStage::DocumentSetExtracted;

        let main_file = find_main_tex_file(directory)?;
        advance(&mut stage, CompileStage::MainFileSelected);
        info!("Main .tex file: {:?}", main_file);

        if self.config.inject_fonts {
            self.inject_typesetting(&main_file)?;
        }
        advance(&mut stage, CompileStage::TypesettingInjected);

        let (pdf, passes) = self.compile(&main_file).await?;
        advance(&mut stage, CompileStage::Compiled);

        FileManager::move_file(&pdf, final_path)
            .map_err(|e| CompileError::Io(std::io::Error::other(e.to_string())))?;
        advance(&mut stage, CompileStage::ArtifactRelocated);
        info!("PDF compiled and saved as: {:?}", final_path);

        Ok(CompileOutcome {
            main_file,
            artifact: final_path.to_path_buf(),
            passes,
            stage,
        })
    }

    /// Remove legacy CJK lines and insert the font setup after `\documentclass`
    pub fn inject_typesetting(&self, main_file: &Path) -> Result<(), CompileError> {
        let bytes = fs::read(main_file)?;
        let text = String::from_utf8_lossy(&bytes);
        let lines: Vec<String> = text.split_inclusive('\n').map(String::from).collect();

        let lines = typesetting::remove_cjk_related_lines(lines);
        let block = typesetting::font_setup_block(
            language_utils::is_cjk_language(&self.typesetting.target_language),
            language_utils::language_part1(&self.typesetting.target_language) == Some("ko"),
            &self.typesetting.font_name,
            &self.typesetting.mono_font_name,
        );

        let lines = match typesetting::inject_font_setup(lines.clone(), &block) {
            Some(lines) => lines,
            None => {
                warn!("No \\documentclass line in {:?}; font setup not added", main_file);
                lines
            }
        };

        FileManager::write_atomic(main_file, &lines.concat())
            .map_err(|e| CompileError::Io(std::io::Error::other(e.to_string())))?;
        debug!("Font setup added to {:?}", main_file);
        Ok(())
    }

    /// Run the compiler once or twice; returns the produced PDF and the pass count
    pub async fn compile(&self, main_file: &Path) -> Result<(PathBuf, u32), CompileError> {
        let working_dir = main_file.parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let file_name = main_file.file_name()
            .ok_or_else(|| CompileError::MainFileNotFound(main_file.to_path_buf()))?;

        let passes = if self.config.compile_twice { 2 } else { 1 };
        let timeout = Duration::from_secs(self.config.timeout_secs.max(1));

        for pass in 1..=passes {
            info!("Running {} (pass {} of {})", self.config.compiler, pass, passes);

            let compiler_future = Command::new(&self.config.compiler)
                .arg("-interaction=nonstopmode")
                .arg(file_name)
                .current_dir(&working_dir)
                .kill_on_drop(true)
                .output();

            let output = tokio::select! {
                result = compiler_future => {
                    result.map_err(|e| CompileError::Launch {
                        compiler: self.config.compiler.clone(),
                        message: e.to_string(),
                    })?
                },
                _ = tokio::time::sleep(timeout) => {
                    return Err(CompileError::Timeout(timeout.as_secs()));
                }
            };

            let stdout = String::from_utf8_lossy(&output.stdout);
            debug!("{} output (last lines):\n{}", self.config.compiler, tail(&stdout, 20));

            if !output.status.success() {
                if pass == passes {
                    return Err(CompileError::ExitStatus { code: output.status.code() });
                }
                warn!("{} pass {} exited with {:?}", self.config.compiler, pass, output.status.code());
            }
        }

        let pdf = main_file.with_extension("pdf");
        if !pdf.is_file() {
            return Err(CompileError::OutputMissing(pdf));
        }

        Ok((pdf, passes))
    }
}

fn advance(stage: &mut CompileStage, next: CompileStage) {
    debug!("Compilation stage: {:?} -> {:?}", stage, next);
    *stage = next;
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}
