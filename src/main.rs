use log::info;
use sobel_stream::config::load_config;
use sobel_stream::SobelPipeline;
use std::env;
use std::path::Path;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = load_config(Path::new(&config_path))?;

    let mut source = config.build_source()?;
    let mut sink = config.build_sink();
    let pipeline = SobelPipeline::new(config.pipeline_options());
    let summary = pipeline
        .run(&mut source, &mut sink)
        .map_err(|e| format!("Pipeline failed: {e}"))?;

    summary.report.write_csv(&config.output.report_csv)?;
    info!("Wrote {}", config.output.report_csv.display());
    if let Some(path) = &config.output.report_json {
        sobel_stream::image::io::write_json_file(path, &summary)?;
        info!("Wrote {}", path.display());
    }

    println!(
        "Processed {} frames ({:?}); report saved to {}",
        summary.frames,
        summary.exit,
        config.output.report_csv.display()
    );
    Ok(())
}

fn usage() -> String {
    "Usage: sobel_stream <config.json>".to_string()
}
