use partlib::generate::{SCRIPTS_DIR, generate_scripts};
use partlib::library::{self, Library};
use partlib::render::PlaceholderRenderer;
use partlib::template::{
    AutocreateOutcome, GENERATORS_DIR, LIBRARY_FILE, autocreate_library, template_handle_aliases,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/json_files")
        .join(name)
}

#[test]
fn resolved_library_drops_aliases_and_keeps_part_order() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("library.json");
    template_handle_aliases(fixture("library_with_aliases.json"), &out).unwrap();

    let doc = library::load_document(&out).unwrap();
    let sections: Vec<&str> = doc.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(sections, vec!["metadata", "generators", "rules", "data"]);

    let lib = Library::from_document(doc).unwrap();
    let ids: Vec<&str> = lib.data.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["608ZZ", "624ZZ"]);

    let part = lib.part("624ZZ").unwrap();
    let fields: Vec<&str> = part.fields.keys().map(String::as_str).collect();
    assert_eq!(
        fields,
        vec![
            "description",
            "generator",
            "weight",
            "inner_diameter",
            "outer_diameter",
            "width"
        ]
    );
}

#[test]
fn resolving_twice_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let once = dir.path().join("once.json");
    let twice = dir.path().join("twice.json");
    template_handle_aliases(fixture("library_with_aliases.json"), &once).unwrap();
    template_handle_aliases(&once, &twice).unwrap();
    assert_eq!(
        fs::read_to_string(&once).unwrap(),
        fs::read_to_string(&twice).unwrap()
    );
}

#[test]
fn template_to_scripts() {
    let dir = tempfile::tempdir().unwrap();
    let gen_dir = dir.path().join(GENERATORS_DIR);
    fs::create_dir_all(&gen_dir).unwrap();
    fs::write(
        gen_dir.join("washer.py"),
        "inner = {{ inner_diameter }}\nouter = {{ outer_diameter }}\n",
    )
    .unwrap();

    let template = dir.path().join("library_template.json");
    fs::write(
        &template,
        r#"{
  "metadata": {"name": "washers", "units": {"length": ["mm", ["inner_diameter", "outer_diameter"]]}},
  "generators": { {{ generators }} },
  "rules": ["inner_diameter < outer_diameter"],
  "aliases": {"M6": {"inner_diameter": 6.4, "outer_diameter": 12.0}},
  "data": {
    "washer_M6": {"description": "M6 washer", "generator": "washer", "size": "__alias__M6"}
  }
}
"#,
    )
    .unwrap();

    let renderer = PlaceholderRenderer::new().unwrap();
    let outcome = autocreate_library(&template, &renderer).unwrap();
    let AutocreateOutcome::Created { path, .. } = outcome else {
        panic!("expected a created library");
    };
    assert_eq!(path, dir.path().join(LIBRARY_FILE));

    let report = partlib::check::check_library_file(&path).unwrap();
    assert!(report.is_ok(), "{:?}", report);

    let written = generate_scripts(&path, &renderer).unwrap();
    assert_eq!(written, vec![dir.path().join(SCRIPTS_DIR).join("washer_M6.py")]);
    assert_eq!(
        fs::read_to_string(&written[0]).unwrap(),
        "inner = 6.4\nouter = 12.0\n"
    );
}
