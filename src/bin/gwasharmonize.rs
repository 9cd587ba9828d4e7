use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use gwasharmonize::filter::GENOME_WIDE;
use gwasharmonize::logging::init_tracing;
use gwasharmonize::pipeline::{
    CohortInput, HarmonizeConfig, MatchConfig, QcConfig, TraitInput, check_trait_lists, harmonize,
    parse_sample_sizes, run_match, run_qc,
};
use gwasharmonize::types::CohortSchema;

#[derive(Parser)]
#[command(name = "gwasharmonize")]
#[command(about = "Harmonize GWAS summary statistics across two cohorts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaArg {
    Bbj,
    Ukbb,
}

impl From<SchemaArg> for CohortSchema {
    fn from(value: SchemaArg) -> Self {
        match value {
            SchemaArg::Bbj => CohortSchema::Bbj,
            SchemaArg::Ukbb => CohortSchema::Ukbb,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Normalize one cohort file into a QC table.
    Qc {
        #[arg(long, required = true)]
        file: PathBuf,
        #[arg(long, value_enum)]
        schema: SchemaArg,
        #[arg(long, required = true)]
        output: PathBuf,
        #[arg(long)]
        reference: Option<PathBuf>,
        #[arg(long)]
        n: Option<f64>,
        #[arg(long)]
        overwrite: bool,
    },
    /// Join a BBJ-style and a UKBB-style file on position and harmonize alleles.
    Match {
        #[arg(long, required = true)]
        bbj: PathBuf,
        #[arg(long, required = true)]
        ukbb: PathBuf,
        #[arg(long, required = true)]
        output: PathBuf,
        #[arg(long)]
        reference: Option<PathBuf>,
        #[arg(long)]
        p_threshold: Option<f64>,
        #[arg(long)]
        overwrite: bool,
    },
    /// Full pipeline for one or more traits.
    Run {
        #[arg(long, required = true)]
        traits: String,
        #[arg(long, required = true)]
        bbj: String,
        #[arg(long, required = true)]
        ukbb: String,
        #[arg(long, required = true)]
        bbj_n: String,
        #[arg(long, required = true)]
        ukbb_n: String,
        #[arg(long)]
        bbj_clump: Option<String>,
        #[arg(long)]
        ukbb_clump: Option<String>,
        #[arg(long, required = true)]
        reference: PathBuf,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        #[arg(long, default_value_t = GENOME_WIDE)]
        threshold: f64,
        #[arg(long)]
        parallel: bool,
        #[arg(long)]
        cores: Option<usize>,
        #[arg(long)]
        overwrite: bool,
    },
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Qc {
            file,
            schema,
            output,
            reference,
            n,
            overwrite,
        } => {
            let config = QcConfig {
                file,
                schema: schema.into(),
                output,
                reference,
                sample_size: n,
                overwrite,
                column_names: Default::default(),
            };
            let records = run_qc(&config)?;
            tracing::info!("{} records written", records.len());
        }
        Command::Match {
            bbj,
            ukbb,
            output,
            reference,
            p_threshold,
            overwrite,
        } => {
            let config = MatchConfig {
                bbj,
                ukbb,
                output,
                reference,
                p_threshold,
                overwrite,
                column_names: Default::default(),
            };
            run_match(&config)?;
        }
        Command::Run {
            traits,
            bbj,
            ukbb,
            bbj_n,
            ukbb_n,
            bbj_clump,
            ukbb_clump,
            reference,
            out_dir,
            threshold,
            parallel,
            cores,
            overwrite,
        } => {
            let names = split_string_list(traits);
            let bbj = split_path_list(bbj);
            let ukbb = split_path_list(ukbb);
            let bbj_n = parse_sample_sizes(&bbj_n, "--bbj-n")?;
            let ukbb_n = parse_sample_sizes(&ukbb_n, "--ukbb-n")?;
            let bbj_clump = bbj_clump.map(split_path_list);
            let ukbb_clump = ukbb_clump.map(split_path_list);

            let mut lists = vec![
                ("bbj", bbj.len()),
                ("ukbb", ukbb.len()),
                ("bbj_n", bbj_n.len()),
                ("ukbb_n", ukbb_n.len()),
            ];
            if let Some(v) = &bbj_clump {
                lists.push(("bbj_clump", v.len()));
            }
            if let Some(v) = &ukbb_clump {
                lists.push(("ukbb_clump", v.len()));
            }
            check_trait_lists(names.len(), &lists)?;

            let traits = names
                .into_iter()
                .enumerate()
                .map(|(i, name)| TraitInput {
                    name,
                    bbj: CohortInput {
                        path: bbj[i].clone(),
                        schema: CohortSchema::Bbj,
                        sample_size: bbj_n[i],
                        clump: bbj_clump.as_ref().map(|v| v[i].clone()),
                    },
                    ukbb: CohortInput {
                        path: ukbb[i].clone(),
                        schema: CohortSchema::Ukbb,
                        sample_size: ukbb_n[i],
                        clump: ukbb_clump.as_ref().map(|v| v[i].clone()),
                    },
                })
                .collect();

            let config = HarmonizeConfig {
                traits,
                reference,
                out_dir,
                threshold,
                parallel: parallel || cores.is_some(),
                cores,
                overwrite,
                column_names: Default::default(),
            };
            for outcome in harmonize(&config)? {
                tracing::info!(
                    "{}: {} matched variants ({} allele-flipped)",
                    outcome.name,
                    outcome.matches.matched,
                    outcome.matches.flipped
                );
            }
        }
    }

    Ok(())
}

fn split_string_list(input: String) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn split_path_list(input: String) -> Vec<PathBuf> {
    split_string_list(input)
        .into_iter()
        .map(PathBuf::from)
        .collect()
}
