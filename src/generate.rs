//! Per-part geometry script generation.
//!
//! For each part, the lines of its generator are joined into a template and
//! rendered with the part's fields as context. Output goes to
//! `<library dir>/scripts/<part id>.py`.

use crate::check::{self, ErrorMap};
use crate::error::{LibraryError, LibraryResult};
use crate::library::{Library, Part, write_text};
use crate::render::Renderer;
use crate::template::LIBRARY_FILE;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const SCRIPTS_DIR: &str = "scripts";

/// Generator source lines joined back into one template.
pub fn script_template(lines: &[String]) -> String {
    lines.concat()
}

/// Render the script of one part.
pub fn render_part_script(
    library: &Library,
    part: &Part,
    renderer: &dyn Renderer,
) -> LibraryResult<String> {
    let generator = part
        .generator()
        .ok_or_else(|| LibraryError::MissingGenerator {
            part: part.id.clone(),
        })?;
    let lines = library
        .generators
        .get(generator)
        .ok_or_else(|| LibraryError::UnknownGenerator {
            part: part.id.clone(),
            generator: generator.to_string(),
        })?;

    renderer
        .render(&script_template(lines), &part.fields)
        .map_err(|source| LibraryError::PartRender {
            part: part.id.clone(),
            generator: generator.to_string(),
            source,
        })
}

fn ensure_dir(path: &Path) -> LibraryResult<()> {
    if path.is_dir() {
        tracing::info!("folder {} already exists", path.display());
    } else {
        fs::create_dir_all(path)?;
        tracing::info!("creating {} folder", path.display());
    }
    Ok(())
}

/// Write one script per part next to the library file. Returns the written paths.
pub fn generate_scripts(
    library_path: impl AsRef<Path>,
    renderer: &dyn Renderer,
) -> LibraryResult<Vec<PathBuf>> {
    let library_path = library_path.as_ref();
    let base = library_path.parent().unwrap_or_else(|| Path::new("."));
    let scripts_dir = base.join(SCRIPTS_DIR);
    ensure_dir(&scripts_dir)?;

    let library = check::load_resolved(library_path)?;

    let mut written = Vec::with_capacity(library.data.len());
    for part in &library.data {
        let text = render_part_script(&library, part, renderer)?;
        let path = scripts_dir.join(format!("{}.py", part.id));
        write_text(&path, &text)?;
        tracing::debug!("wrote {}", path.display());
        written.push(path);
    }

    tracing::info!("{} script(s) written to {}", written.len(), scripts_dir.display());
    Ok(written)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryStatus {
    pub path: PathBuf,
    pub ok: bool,
    pub errors: ErrorMap,
    pub scripts: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub libraries: Vec<LibraryStatus>,
}

impl BatchSummary {
    pub fn all_ok(&self) -> bool {
        self.libraries.iter().all(|l| l.ok)
    }
}

/// Every `library.json` under `dir`, in sorted walk order. Symlinks are not
/// followed.
pub fn find_libraries(dir: impl AsRef<Path>) -> LibraryResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && entry.file_name() == LIBRARY_FILE {
            found.push(entry.into_path());
        }
    }
    Ok(found)
}

/// Check the rules of every library under `base_dir` and generate scripts for
/// the clean ones. With `preview`, nothing is written.
pub fn generate_all(
    base_dir: impl AsRef<Path>,
    preview: bool,
    renderer: &dyn Renderer,
) -> LibraryResult<BatchSummary> {
    let mut summary = BatchSummary::default();

    for path in find_libraries(base_dir)? {
        tracing::info!("library filename : {}", path.display());
        tracing::info!("checking the rules for the library JSON ...");
        let outcome = check::check_library_json_rules(&path)?;

        let mut scripts = 0;
        if outcome.ok {
            tracing::info!("... done. Rules are OK");
            if !preview {
                scripts = generate_scripts(&path, renderer)?.len();
            }
        } else {
            tracing::error!(
                "{} contains errors, please correct these before generating the scripts",
                path.display()
            );
        }

        summary.libraries.push(LibraryStatus {
            path,
            ok: outcome.ok,
            errors: outcome.errors,
            scripts,
        });
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::PlaceholderRenderer;
    use pretty_assertions::assert_eq;

    const LIBRARY: &str = r#"{
  "metadata": {"name": "rods", "units": {"length": ["mm", ["radius", "length"]]}},
  "generators": {"rod": ["radius = {{ radius }}\n", "length = {{ length }}\n"]},
  "rules": ["radius > 0", "length > 0"],
  "aliases": {},
  "data": {
    "rod_1": {"description": "Part number 1", "generator": "rod", "radius": 10.0, "length": 20.0},
    "rod_2": {"description": "Part number 2", "generator": "rod", "radius": 10.0, "length": 40.0}
  }
}
"#;

    #[test]
    fn writes_one_script_per_part() {
        let dir = tempfile::tempdir().unwrap();
        let lib_path = dir.path().join(LIBRARY_FILE);
        fs::write(&lib_path, LIBRARY).unwrap();

        let renderer = PlaceholderRenderer::new().unwrap();
        let written = generate_scripts(&lib_path, &renderer).unwrap();

        assert_eq!(
            written,
            vec![
                dir.path().join(SCRIPTS_DIR).join("rod_1.py"),
                dir.path().join(SCRIPTS_DIR).join("rod_2.py"),
            ]
        );
        assert_eq!(
            fs::read_to_string(&written[1]).unwrap(),
            "radius = 10.0\nlength = 40.0\n"
        );
    }

    #[test]
    fn unknown_generator_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let lib_path = dir.path().join(LIBRARY_FILE);
        fs::write(&lib_path, LIBRARY.replace("\"generator\": \"rod\"", "\"generator\": \"bolt\"")).unwrap();

        let renderer = PlaceholderRenderer::new().unwrap();
        let err = generate_scripts(&lib_path, &renderer).unwrap_err();
        assert!(matches!(err, LibraryError::UnknownGenerator { ref generator, .. } if generator == "bolt"));
    }

    #[test]
    fn batch_skips_libraries_that_break_rules() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("a_good");
        let bad = dir.path().join("b_bad");
        fs::create_dir_all(&good).unwrap();
        fs::create_dir_all(&bad).unwrap();
        fs::write(good.join(LIBRARY_FILE), LIBRARY).unwrap();
        fs::write(
            bad.join(LIBRARY_FILE),
            LIBRARY.replace("\"length\": 40.0", "\"length\": -40.0"),
        )
        .unwrap();

        let renderer = PlaceholderRenderer::new().unwrap();
        let summary = generate_all(dir.path(), false, &renderer).unwrap();

        assert!(!summary.all_ok());
        assert_eq!(summary.libraries.len(), 2);
        assert_eq!(summary.libraries[0].scripts, 2);
        assert!(summary.libraries[0].ok);
        assert!(!summary.libraries[1].ok);
        assert_eq!(summary.libraries[1].errors["rod_2"], vec!["length > 0".to_string()]);
        assert!(!bad.join(SCRIPTS_DIR).exists());
    }

    #[test]
    fn preview_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(LIBRARY_FILE), LIBRARY).unwrap();

        let renderer = PlaceholderRenderer::new().unwrap();
        let summary = generate_all(dir.path(), true, &renderer).unwrap();
        assert!(summary.all_ok());
        assert_eq!(summary.libraries[0].scripts, 0);
        assert!(!dir.path().join(SCRIPTS_DIR).exists());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_ancestor_is_not_walked_again() {
        let dir = tempfile::tempdir().unwrap();
        let lib_dir = dir.path().join("lib");
        fs::create_dir_all(&lib_dir).unwrap();
        fs::write(lib_dir.join(LIBRARY_FILE), LIBRARY).unwrap();
        std::os::unix::fs::symlink(dir.path(), lib_dir.join("loop")).unwrap();

        assert_eq!(find_libraries(dir.path()).unwrap(), vec![lib_dir.join(LIBRARY_FILE)]);

        let renderer = PlaceholderRenderer::new().unwrap();
        let summary = generate_all(dir.path(), true, &renderer).unwrap();
        assert_eq!(summary.libraries.len(), 1);
    }
}
