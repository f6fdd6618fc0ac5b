use structure_detector::profile::{load_profile, save_profile, DetectorProfile, StructureType};
use std::env;
use std::fs;
use std::path::Path;

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("generate") => {
            let selector = args.get(1).ok_or_else(usage)?;
            let out_dir = args.get(2).ok_or_else(usage)?;
            generate(selector, Path::new(out_dir))
        }
        Some("validate") if args.len() > 1 => validate(&args[1..]),
        _ => Err(usage()),
    }
}

fn usage() -> String {
    "Usage: profile_tool generate <structure_type|all> <out_dir>\n       \
     profile_tool validate <profile.json>..."
        .to_string()
}

fn generate(selector: &str, out_dir: &Path) -> Result<(), String> {
    let types: Vec<StructureType> = if selector == "all" {
        StructureType::ALL.to_vec()
    } else {
        vec![selector.parse()?]
    };
    fs::create_dir_all(out_dir)
        .map_err(|e| format!("Failed to create {}: {e}", out_dir.display()))?;
    for structure_type in types {
        let profile = DetectorProfile::for_structure_type(structure_type);
        let path = out_dir.join(format!("{structure_type}.json"));
        save_profile(&path, &profile)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn validate(paths: &[String]) -> Result<(), String> {
    let mut failures = 0usize;
    for raw in paths {
        let path = Path::new(raw);
        match load_profile(path) {
            Ok(profile) => {
                let issues = profile.validate();
                if issues.is_empty() {
                    println!(
                        "{}: OK (`{}`, {} feature(s) enabled)",
                        path.display(),
                        profile.name,
                        profile.enabled_features().count()
                    );
                    for (kind, weight) in profile.normalized_weights() {
                        println!("  {kind}: weight {weight:.2}");
                    }
                } else {
                    failures += 1;
                    println!("{}: {} issue(s)", path.display(), issues.len());
                    for issue in issues {
                        println!("  - {issue}");
                    }
                }
            }
            Err(err) => {
                failures += 1;
                println!("{err}");
            }
        }
    }
    if failures > 0 {
        Err(format!("{failures} profile(s) failed validation"))
    } else {
        Ok(())
    }
}
