//! Integration tests for the quire CLI
//!
//! The command functions are called directly; every test disables system
//! fonts so output does not depend on the host.

use std::fs;
use std::path::PathBuf;

use quire_cli::{
    compile_command, fonts_command, load_settings, parse_command, query_command, CompileArgs,
    FontArgs, FontsArgs, ListingFormat, QueryArgs, WorldArgs,
};
use quire_core::Settings;
use tempfile::TempDir;

fn world() -> WorldArgs {
    WorldArgs {
        fonts: FontArgs {
            ignore_system_fonts: true,
            ..FontArgs::default()
        },
        offline: true,
        ..WorldArgs::default()
    }
}

fn write_doc(dir: &TempDir, text: &str) -> PathBuf {
    let path = dir.path().join("doc.typ");
    fs::write(&path, text).unwrap();
    path
}

#[test]
fn test_compile_defaults_to_pdf_next_to_input() {
    let dir = TempDir::new().unwrap();
    let input = write_doc(&dir, "= Hello\n\nWorld");

    let args = CompileArgs {
        input: input.clone(),
        output: None,
        format: None,
        ppi: None,
        world: world(),
    };
    let written = compile_command(&args, &Settings::default()).unwrap();

    assert_eq!(written, vec![dir.path().join("doc.pdf")]);
    assert!(fs::read(&written[0]).unwrap().starts_with(b"%PDF-"));
}

#[test]
fn test_compile_svg_pages_with_placeholder() {
    let dir = TempDir::new().unwrap();
    let input = write_doc(&dir, "One\n#pagebreak()\nTwo");

    let args = CompileArgs {
        input,
        output: Some(dir.path().join("out-{n}.svg")),
        format: None,
        ppi: None,
        world: world(),
    };
    let written = compile_command(&args, &Settings::default()).unwrap();

    assert_eq!(
        written,
        vec![dir.path().join("out-1.svg"), dir.path().join("out-2.svg")]
    );
}

#[test]
fn test_compile_passes_sys_inputs() {
    let dir = TempDir::new().unwrap();
    let input = write_doc(
        &dir,
        "#metadata(sys.inputs.at(\"who\", default: \"nobody\")) <who>",
    );

    let mut world = world();
    world.inputs.push(("who".into(), "cli".into()));
    let args = QueryArgs {
        input,
        selector: "<who>".into(),
        field: Some("value".into()),
        one: true,
        format: "json".into(),
        world,
    };
    let output = query_command(&args, &Settings::default()).unwrap();
    assert_eq!(output, "\"cli\"");
}

#[test]
fn test_compile_error_fails_command() {
    let dir = TempDir::new().unwrap();
    let input = write_doc(&dir, "#panic(\"stop\")");

    let args = CompileArgs {
        input,
        output: None,
        format: Some("pdf".into()),
        ppi: None,
        world: world(),
    };
    let err = compile_command(&args, &Settings::default()).unwrap_err();
    assert!(err.to_string().contains("stop"));
}

#[test]
fn test_package_path_is_searched() {
    let dir = TempDir::new().unwrap();
    let package = dir.path().join("packages/local/util/0.2.0");
    fs::create_dir_all(&package).unwrap();
    fs::write(
        package.join("typst.toml"),
        "[package]\nname = \"util\"\nversion = \"0.2.0\"\nentrypoint = \"lib.typ\"\n",
    )
    .unwrap();
    fs::write(package.join("lib.typ"), "#let answer = 42").unwrap();
    let input = write_doc(
        &dir,
        "#import \"@local/util:0.2.0\": answer\n#metadata(answer) <answer>",
    );

    let mut world = world();
    world.package_path = Some(dir.path().join("packages"));
    let args = QueryArgs {
        input,
        selector: "<answer>".into(),
        field: Some("value".into()),
        one: true,
        format: "json".into(),
        world,
    };
    assert_eq!(query_command(&args, &Settings::default()).unwrap(), "42");
}

#[test]
fn test_unknown_format_fails_command() {
    let dir = TempDir::new().unwrap();
    let input = write_doc(&dir, "text");

    let args = CompileArgs {
        input,
        output: None,
        format: Some("docx".into()),
        ppi: None,
        world: world(),
    };
    assert!(compile_command(&args, &Settings::default()).is_err());
}

#[test]
fn test_query_yaml() {
    let dir = TempDir::new().unwrap();
    let input = write_doc(&dir, "#metadata(\"a\") <m>\n#metadata(\"b\") <m>");

    let args = QueryArgs {
        input,
        selector: "<m>".into(),
        field: Some("value".into()),
        one: false,
        format: "yaml".into(),
        world: world(),
    };
    let output = query_command(&args, &Settings::default()).unwrap();
    assert_eq!(output, "- a\n- b\n");
}

#[test]
fn test_fonts_listing() {
    let args = FontsArgs {
        variants: false,
        format: ListingFormat::Text,
        fonts: FontArgs {
            ignore_system_fonts: true,
            ..FontArgs::default()
        },
    };
    let listing = fonts_command(&args, &Settings::default()).unwrap();
    assert!(listing.lines().any(|line| line == "Linux Libertine"));

    let json_args = FontsArgs {
        variants: true,
        format: ListingFormat::Json,
        ..args
    };
    let json = fonts_command(&json_args, &Settings::default()).unwrap();
    let fonts: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
    assert!(!fonts.is_empty());
    assert!(fonts.iter().all(|font| font.get("path").is_none()));
}

#[test]
fn test_parse_listing() {
    let dir = TempDir::new().unwrap();
    let input = write_doc(&dir, "= Title\n\nSome *bold* text.\n#(1 +");

    let text = parse_command(&input, ListingFormat::Text).unwrap();
    assert!(text.lines().next().unwrap().starts_with("Heading"));
    assert!(text.contains("error: "));

    let json = parse_command(&input, ListingFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["exprs"][0]["variant"], "Heading");
    assert_eq!(value["exprs"][0]["start"], 0);
    assert!(!value["errors"].as_array().unwrap().is_empty());
}

#[test]
fn test_settings_file_is_loaded() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("quire.toml");
    fs::write(&config, "[compile]\nformat = \"svg\"\n[inputs]\nwho = \"file\"\n").unwrap();

    let settings = load_settings(Some(&config)).unwrap();
    assert_eq!(settings.compile.format, "svg");

    let input = write_doc(&dir, "Hello");
    let args = CompileArgs {
        input,
        output: None,
        format: None,
        ppi: None,
        world: world(),
    };
    let written = compile_command(&args, &settings).unwrap();
    assert_eq!(written, vec![dir.path().join("doc.svg")]);
}

#[test]
fn test_missing_settings_file_fails() {
    assert!(load_settings(Some(std::path::Path::new("/no/such/quire.toml"))).is_err());
}
