//! Entrypoint for CLI
use std::{
    env,
    error::Error,
    fs,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    process,
};

use log::error;

static USAGE: &str = r#"
usage: jackc [PATH]

Compiles Jack source files into VM programs.

PATH may be a single .jack file, or a directory that is searched
recursively for .jack files. Each input name.jack produces a sibling
name.vm. When PATH is omitted, it is read from standard input.

examples:
    jackc Main.jack
    jackc projects/Pong
"#;

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new().env().init().unwrap();

    let mut args = env::args().skip(1);
    let path = match args.next() {
        Some(arg) if arg == "-h" || arg == "--help" => {
            print_usage();
            return Ok(());
        }
        Some(arg) => arg,
        None => prompt_path()?,
    };
    if args.next().is_some() {
        print_usage();
        // FreeBSD EX_USAGE (64)
        process::exit(64);
    }

    let mut sources = Vec::new();
    collect_sources(Path::new(&path), &mut sources)?;

    if sources.is_empty() {
        println!("No .jack files found.");
        return Ok(());
    }

    for source_path in &sources {
        // A failed file is reported and the batch moves on.
        match compile_file(source_path) {
            Ok(out_path) => println!("{} created.", out_path.display()),
            Err(err) => error!("{}: {}", source_path.display(), err),
        }
    }

    Ok(())
}

/// Compile one source file into a sibling `.vm` file.
fn compile_file(path: &Path) -> Result<PathBuf, Box<dyn Error>> {
    let source = fs::read_to_string(path)?;
    let out_path = path.with_extension("vm");

    let file = fs::File::create(&out_path)?;
    jackc::compile(&source, BufWriter::new(file))?;

    Ok(out_path)
}

/// Gather source files bearing the `.jack` extension, case-insensitive.
///
/// A directory is searched recursively. A path that is neither a file
/// nor a directory is a "not found" error.
fn collect_sources(path: &Path, sources: &mut Vec<PathBuf>) -> io::Result<()> {
    if path.is_file() {
        if has_jack_extension(path) {
            sources.push(path.to_path_buf());
        }
    } else if path.is_dir() {
        for entry in fs::read_dir(path)? {
            collect_sources(&entry?.path(), sources)?;
        }
    } else {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("could not find file or directory '{}'", path.display()),
        ));
    }

    Ok(())
}

fn has_jack_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("jack"))
        .unwrap_or(false)
}

fn prompt_path() -> io::Result<String> {
    print!("Please enter a path: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_owned())
}

fn print_usage() {
    println!("{USAGE}");
}

#[cfg(test)]
mod test {
    use super::*;

    /// Scratch directory removed on drop, so a failing assert
    /// doesn't leak files across runs.
    struct ScratchDir(PathBuf);

    impl ScratchDir {
        fn new(label: &str) -> Self {
            let path = env::temp_dir().join(format!("jackc-{}-{}", label, process::id()));
            let _ = fs::remove_dir_all(&path);
            fs::create_dir_all(path.join("sub")).expect("create scratch dir");
            Self(path)
        }
    }

    impl Drop for ScratchDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    const MINIMAL_CLASS: &str = "\
class Main {
    function void main() {
        return;
    }
}
";

    #[test]
    fn test_collect_sources_filters_extension() {
        let scratch = ScratchDir::new("discover");
        let dir = &scratch.0;

        fs::write(dir.join("Main.jack"), MINIMAL_CLASS).unwrap();
        fs::write(dir.join("Square.JACK"), MINIMAL_CLASS).unwrap();
        fs::write(dir.join("sub").join("Game.jack"), MINIMAL_CLASS).unwrap();
        fs::write(dir.join("notes.txt"), "not a source file").unwrap();
        fs::write(dir.join("Main.vm"), "push constant 0").unwrap();

        let mut sources = Vec::new();
        collect_sources(dir, &mut sources).expect("discovery");
        assert_eq!(sources.len(), 3);
        assert!(sources.iter().all(|p| has_jack_extension(p)));
    }

    #[test]
    fn test_collect_sources_missing_path() {
        let err = collect_sources(Path::new("/no/such/path.jack"), &mut Vec::new())
            .expect_err("should not exist");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_compile_file_names_output() {
        let scratch = ScratchDir::new("compile");
        let source_path = scratch.0.join("Main.jack");
        fs::write(&source_path, MINIMAL_CLASS).unwrap();

        let out_path = compile_file(&source_path).expect("compile");
        assert_eq!(out_path, scratch.0.join("Main.vm"));

        let vm = fs::read_to_string(&out_path).expect("output written");
        assert_eq!(vm, "function Main.main 0\npush constant 0\nreturn\n");
    }
}
