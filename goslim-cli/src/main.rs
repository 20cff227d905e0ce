use clap::{App, Arg, ArgMatches};
use anyhow::{Context, Result};
use std::path::Path;
use goslim::{read_obo, Pipeline};

fn app<'a, 'b>() -> clap::App<'a, 'b> {
    App::new("goslim")
        .about("Converts a set of GO annotations to a given GO slim")
        .arg(Arg::with_name("go")
            .long("go")
            .short("g")
            .help("Path to the full Gene Ontology OBO file")
            .env("GOSLIM_GO")
            .required(true)
            .takes_value(true))
        .arg(Arg::with_name("slim")
            .long("slim")
            .short("s")
            .help("Path to the GO slim OBO file")
            .env("GOSLIM_SLIM")
            .required(true)
            .takes_value(true))
        .arg(Arg::with_name("annotation")
            .long("annotation")
            .short("a")
            .help("Path to the annotation file (GAF, BiNGO or tabular, optionally gzipped)")
            .env("GOSLIM_ANNOTATION")
            .required(true)
            .takes_value(true))
        .arg(Arg::with_name("output")
            .long("output")
            .short("o")
            .help("Path to the output GO slim annotation file")
            .env("GOSLIM_OUTPUT")
            .required(true)
            .takes_value(true))
        .arg(Arg::with_name("expand_slim")
            .long("expand-slim")
            .help("Also infer slim annotations from the slim ontology's own hierarchy"))
        .arg(Arg::with_name("verbose")
            .long("verbose")
            .short("v")
            .multiple(true)
            .help("Log more detail (-v debug, -vv trace)"))
}

fn main() {
    // A missing .env file is fine, settings may come from flags or the environment
    let _ = dotenv::dotenv();
    let matches = app().get_matches();
    init_logger(matches.occurrences_of("verbose"));

    if let Err(e) = run(&matches) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn init_logger(verbosity: u64) {
    let level = match verbosity {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_env("RUST_LOG")
        .format_timestamp_secs()
        .init();
}

fn run(args: &ArgMatches) -> Result<()> {
    let go_path = Path::new(args.value_of("go").context("no GO file given")?);
    let slim_path = Path::new(args.value_of("slim").context("no GO slim file given")?);
    let annotation_path = Path::new(args.value_of("annotation").context("no annotation file given")?);
    let output_path = Path::new(args.value_of("output").context("no output file given")?);

    log::info!("Reading ontology from '{}'", go_path.display());
    let go = read_obo(go_path).context("failed to load the GO")?;
    log::info!("Loaded {} terms (version {})", go.len(), go.version().unwrap_or("unknown"));

    log::info!("Reading slim ontology from '{}'", slim_path.display());
    let slim = read_obo(slim_path).context("failed to load the GO slim")?;
    log::info!("Loaded {} slim terms (version {})", slim.len(), slim.version().unwrap_or("unknown"));

    let pipeline = Pipeline::new(&go, &slim)
        .expand_slim(args.is_present("expand_slim"));
    let summary = pipeline.run(annotation_path, output_path)
        .context("failed to slim annotations")?;

    log::info!("Finished: {} genes, {} asserted, {} after closure, {} slim, {} written",
        summary.genes, summary.asserted, summary.closed, summary.slimmed, summary.written);
    Ok(())
}
