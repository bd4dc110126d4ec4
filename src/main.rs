use callguard::jvm::{BinaryName, Name};
use callguard::*;

use clap::{App, Arg};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::exit;
use walkdir::WalkDir;

fn main() -> Result<(), Error> {
    env_logger::init();

    let matches = App::new("JVM call interceptor")
        .version("0.1.0")
        .about("Redirects calls to sensitive JVM methods in class files to interceptor routines")
        .arg(
            Arg::with_name("patterns")
                .long("patterns")
                .value_name("FILE")
                .takes_value(true)
                .help("Sets the pattern configuration file (defaults to the built-in patterns)"),
        )
        .arg(
            Arg::with_name("interceptor")
                .long("interceptor")
                .value_name("CLASS")
                .takes_value(true)
                .help("Sets the class holding the interceptor methods")
                .default_value("callguard/Interceptors"),
        )
        .arg(
            Arg::with_name("max nesting")
                .long("max-nesting")
                .value_name("N")
                .takes_value(true)
                .help("Sets how deeply dynamic constants may be nested"),
        )
        .arg(
            Arg::with_name("output")
                .long("output")
                .value_name("DIRECTORY")
                .takes_value(true)
                .required(true)
                .help("Sets the directory rewritten classes are written to"),
        )
        .arg(
            Arg::with_name("INPUT")
                .help("Sets the input class files or folders")
                .required(true)
                .multiple(true)
                .index(1),
        )
        .get_matches();

    let mut settings = Settings::new();
    if let Some(patterns) = matches.value_of_os("patterns") {
        settings.patterns = PatternSource::File(PathBuf::from(patterns));
    }
    if let Some(interceptor) = matches.value_of("interceptor") {
        settings.interceptor_class_name =
            BinaryName::from_string(interceptor.to_owned()).map_err(Error::BadPattern)?;
    }
    if let Some(max_nesting) = matches.value_of("max nesting") {
        match max_nesting.parse() {
            Ok(max_nesting) => settings.max_constant_nesting = max_nesting,
            Err(_) => {
                log::error!("Invalid nesting limit '{}'", max_nesting);
                exit(2);
            }
        }
    }
    let output_path = PathBuf::from(matches.value_of_os("output").unwrap());

    let agent = Agent::new(&settings)?;
    let transformer = agent.transformer();

    // Find all of the classes, in a stable order
    let mut classes: Vec<(PathBuf, PathBuf)> = vec![];
    for input in matches.values_of_os("INPUT").unwrap() {
        let input_path = Path::new(input);
        if input_path.is_file() {
            let relative = PathBuf::from(input_path.file_name().unwrap_or(input));
            classes.push((input_path.to_owned(), relative));
            continue;
        }
        for entry in WalkDir::new(input_path)
            .follow_links(true)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::error!("Could not walk '{}': {}", input_path.display(), err);
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() || path.extension().map_or(true, |ext| ext != "class") {
                continue;
            }
            let relative = path.strip_prefix(input_path).unwrap_or(path).to_owned();
            classes.push((path.to_owned(), relative));
        }
    }

    let mut count_changed = 0;
    let mut count_unchanged = 0;
    let mut count_failed = 0;
    for (class_path, relative) in classes {
        match patch_class(&transformer, &class_path, &output_path.join(&relative)) {
            Ok(true) => {
                log::info!("Rewrote '{}'", class_path.display());
                count_changed += 1;
            }
            Ok(false) => {
                log::debug!("Unchanged '{}'", class_path.display());
                count_unchanged += 1;
            }
            Err(err) => {
                log::error!("Failed to rewrite '{}': {:?}", class_path.display(), err);
                count_failed += 1;
            }
        }
    }

    log::info!(
        "{} rewritten, {} unchanged, {} failed",
        count_changed,
        count_unchanged,
        count_failed
    );
    if count_failed > 0 {
        exit(1);
    }
    Ok(())
}

/// Rewrite one class file, writing it out only if something got redirected
fn patch_class(
    transformer: &ClassTransformer,
    class_path: &Path,
    output_path: &Path,
) -> Result<bool, Error> {
    let class_bytes = fs::read(class_path)?;
    match transformer.transform_class(&class_bytes)? {
        None => Ok(false),
        Some(rewritten) => {
            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(output_path, rewritten)?;
            Ok(true)
        }
    }
}
