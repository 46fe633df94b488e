/*!
 * Tests for main file selection and the compilation driver
 */

use std::fs;
use papertrans::app_config::CompileConfig;
use papertrans::compiler::{CompilationDriver, CompileStage, TypesettingOptions, find_main_tex_file};
use papertrans::errors::CompileError;
use crate::common;

fn options(language: &str) -> TypesettingOptions {
    TypesettingOptions {
        target_language: language.to_string(),
        font_name: "Noto Serif".to_string(),
        mono_font_name: "Noto Sans Mono".to_string(),
    }
}

#[test]
fn test_find_main_tex_file_withSamplePaper_shouldPickRoot() {
    let dir = common::create_temp_dir().unwrap();
    common::create_sample_paper(dir.path()).unwrap();

    assert_eq!(find_main_tex_file(dir.path()).unwrap(), dir.path().join("main.tex"));
}

#[test]
fn test_find_main_tex_file_withNestedRoot_shouldSearchSubdirectories() {
    let dir = common::create_temp_dir().unwrap();
    common::create_test_file(dir.path(), "a/notes.tex", "Some notes\n").unwrap();
    let root = common::create_test_file(dir.path(), "paper/ms.tex", "\\documentclass{revtex4}\n\\begin{document}\n").unwrap();

    assert_eq!(find_main_tex_file(dir.path()).unwrap(), root);
}

#[tokio::test]
async fn test_run_withoutTexFiles_shouldFailBeforeCompiling() {
    let dir = common::create_temp_dir().unwrap();
    common::create_test_file(dir.path(), "figure.png", "png").unwrap();
    let driver = CompilationDriver::new(CompileConfig::default(), options("Korean"));

    let result = driver.run(dir.path(), &dir.path().join("out.pdf")).await;

    assert!(matches!(result, Err(CompileError::MainFileNotFound(_))));
}

#[tokio::test]
async fn test_compile_withMissingBinary_shouldReportLaunchFailure() {
    let dir = common::create_temp_dir().unwrap();
    let main = common::create_test_file(dir.path(), "main.tex", "\\documentclass{article}\n").unwrap();
    let config = CompileConfig {
        compiler: "papertrans-no-such-compiler".to_string(),
        ..CompileConfig::default()
    };
    let driver = CompilationDriver::new(config, options("French"));

    let result = driver.compile(&main).await;

    assert!(matches!(result, Err(CompileError::Launch { .. })));
}

#[test]
fn test_inject_typesetting_forLatinTarget_shouldUseFontspec() {
    let dir = common::create_temp_dir().unwrap();
    let main = common::create_test_file(dir.path(), "main.tex", "\\documentclass{article}\n\\begin{document}\n").unwrap();
    let driver = CompilationDriver::new(CompileConfig::default(), options("fr"));

    driver.inject_typesetting(&main).unwrap();

    let contents = fs::read_to_string(&main).unwrap();
    assert!(contents.contains("\\usepackage{fontspec}\n\\setmainfont{Noto Serif}\n\\setmonofont{Noto Sans Mono}\n"));
    assert!(!contents.contains("xeCJK"));
}

#[test]
fn test_inject_typesetting_forKoreanCode_shouldUseKotexAndXecjk() {
    let dir = common::create_temp_dir().unwrap();
    let main = common::create_test_file(dir.path(), "main.tex", "\\documentclass{article}\n\\begin{document}\n").unwrap();
    let driver = CompilationDriver::new(CompileConfig::default(), options("ko"));

    driver.inject_typesetting(&main).unwrap();

    let contents = fs::read_to_string(&main).unwrap();
    assert!(contents.contains("\\usepackage{kotex}\n\\usepackage{xeCJK}\n\\setCJKmainfont{Noto Serif}\n"));
    assert!(!contents.contains("fontspec"));
}

#[cfg(unix)]
mod with_fake_compiler {
    use super::*;

    fn config_for(compiler: &std::path::Path, compile_twice: bool) -> CompileConfig {
        CompileConfig {
            compiler: compiler.to_string_lossy().to_string(),
            compile_twice,
            timeout_secs: 30,
            inject_fonts: true,
        }
    }

    #[tokio::test]
    async fn test_run_shouldCompileTwiceAndRelocate() {
        let tools = common::create_temp_dir().unwrap();
        let compiler = common::create_fake_compiler(tools.path(), 0, true).unwrap();
        let paper = common::create_temp_dir().unwrap();
        common::create_sample_paper(paper.path()).unwrap();
        let output = common::create_temp_dir().unwrap();
        let final_path = output.path().join("2401.01234.pdf");

        let driver = CompilationDriver::new(config_for(&compiler, true), options("Korean"));
        let outcome = driver.run(paper.path(), &final_path).await.unwrap();

        assert_eq!(outcome.stage, CompileStage::ArtifactRelocated);
        assert_eq!(outcome.passes, 2);
        assert_eq!(outcome.main_file, paper.path().join("main.tex"));
        assert!(final_path.is_file());
        assert!(!paper.path().join("main.pdf").exists());

        let invocations = fs::read_to_string(paper.path().join("invocations.log")).unwrap();
        assert_eq!(invocations.lines().collect::<Vec<_>>(), vec![
            "-interaction=nonstopmode main.tex",
            "-interaction=nonstopmode main.tex",
        ]);

        let main = fs::read_to_string(paper.path().join("main.tex")).unwrap();
        assert!(main.starts_with("\\documentclass{article}\n\\usepackage{kotex}\n\\usepackage{xeCJK}\n"));
    }

    #[tokio::test]
    async fn test_run_withSinglePass_shouldInvokeOnce() {
        let tools = common::create_temp_dir().unwrap();
        let compiler = common::create_fake_compiler(tools.path(), 0, true).unwrap();
        let paper = common::create_temp_dir().unwrap();
        common::create_sample_paper(paper.path()).unwrap();

        let driver = CompilationDriver::new(config_for(&compiler, false), options("Korean"));
        let outcome = driver.run(paper.path(), &paper.path().join("final.pdf")).await.unwrap();

        assert_eq!(outcome.passes, 1);
        let invocations = fs::read_to_string(paper.path().join("invocations.log")).unwrap();
        assert_eq!(invocations.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_run_withFailingCompiler_shouldReportExitStatus() {
        let tools = common::create_temp_dir().unwrap();
        let compiler = common::create_fake_compiler(tools.path(), 1, true).unwrap();
        let paper = common::create_temp_dir().unwrap();
        common::create_sample_paper(paper.path()).unwrap();

        let driver = CompilationDriver::new(config_for(&compiler, true), options("Korean"));
        let result = driver.run(paper.path(), &paper.path().join("final.pdf")).await;

        assert!(matches!(result, Err(CompileError::ExitStatus { code: Some(1) })));
    }

    #[tokio::test]
    async fn test_run_withoutPdf_shouldReportMissingOutput() {
        let tools = common::create_temp_dir().unwrap();
        let compiler = common::create_fake_compiler(tools.path(), 0, false).unwrap();
        let paper = common::create_temp_dir().unwrap();
        common::create_sample_paper(paper.path()).unwrap();

        let driver = CompilationDriver::new(config_for(&compiler, true), options("Korean"));
        let result = driver.run(paper.path(), &paper.path().join("final.pdf")).await;

        assert!(matches!(result, Err(CompileError::OutputMissing(_))));
    }
}
