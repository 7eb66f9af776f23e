//! Command-line client for the DeHack hackathon platform.
//!
//! Runs a single wallet-signed operation with the locally configured wallet,
//! waits for it to be confirmed and prints the decoded result as JSON.

use clap::{Parser, Subcommand, ValueEnum};
use dehack_config::Config;
use dehack_core::ClientBuilder;
use dehack_types::{
	parse_address, Address, BecomeSponsorParams, CreateHackathonParams, OperationParams,
	RegisterParticipantParams, SubmitProjectParams, SubmitScoreParams, ValidationError,
	VotingConfig, VotingSystem,
};
use std::path::PathBuf;

/// Command-line arguments for the DeHack client.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Create a hackathon through the platform factory
	CreateHackathon {
		#[arg(long)]
		hackathon_id: String,
		/// Start, unix seconds
		#[arg(long)]
		start_time: u64,
		/// End, unix seconds
		#[arg(long)]
		end_time: u64,
		/// Minimum sponsor contribution in ETH
		#[arg(long, default_value = "0")]
		min_sponsor_contribution: String,
		/// Participant stake in ETH
		#[arg(long)]
		stake_amount: String,
		/// Prize for each winning place, in prize-token units (repeat per place)
		#[arg(long = "prize", required = true)]
		prizes: Vec<String>,
		/// Judge address (repeat per judge)
		#[arg(long = "judge", required = true)]
		judges: Vec<String>,
		#[arg(long, value_enum, default_value_t = Voting::Open)]
		voting_system: Voting,
		#[arg(long)]
		quadratic: bool,
		#[arg(long, default_value_t = 100)]
		voting_power: u64,
		#[arg(long, default_value_t = 1)]
		max_winners: u64,
		/// Prize pool attached to the transaction, in ETH
		#[arg(long)]
		value: String,
	},
	/// Register the wallet as a participant
	Register {
		#[arg(long)]
		hackathon: String,
		/// Stake in ETH
		#[arg(long)]
		stake: String,
	},
	/// Score a participant's submission as a judge
	Score {
		#[arg(long)]
		hackathon: String,
		#[arg(long)]
		participant: String,
		/// Score from 0 to 100
		#[arg(long, allow_hyphen_values = true)]
		score: i64,
	},
	/// Submit a project
	SubmitProject {
		#[arg(long)]
		hackathon: String,
		#[arg(long)]
		name: String,
		#[arg(long)]
		url: String,
	},
	/// Sponsor a hackathon
	Sponsor {
		#[arg(long)]
		hackathon: String,
		/// Contribution in ETH
		#[arg(long)]
		contribution: String,
	},
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Voting {
	Open,
	Maci,
	Zk,
	RevealCommit,
}

impl From<Voting> for VotingSystem {
	fn from(voting: Voting) -> Self {
		match voting {
			Voting::Open => VotingSystem::Open,
			Voting::Maci => VotingSystem::Maci,
			Voting::Zk => VotingSystem::Zk,
			Voting::RevealCommit => VotingSystem::RevealCommit,
		}
	}
}

impl Command {
	/// Target hackathon (`None` for creation, which goes to the platform) and parameters.
	fn into_operation(self) -> Result<(Option<Address>, OperationParams), ValidationError> {
		let operation = match self {
			Command::CreateHackathon {
				hackathon_id,
				start_time,
				end_time,
				min_sponsor_contribution,
				stake_amount,
				prizes,
				judges,
				voting_system,
				quadratic,
				voting_power,
				max_winners,
				value,
			} => (
				None,
				CreateHackathonParams {
					hackathon_id,
					start_time,
					end_time,
					minimum_sponsor_contribution: min_sponsor_contribution,
					stake_amount,
					prize_distribution: prizes,
					judges,
					voting: VotingConfig {
						system: voting_system.into(),
						quadratic,
						voting_power_per_judge: voting_power,
						max_winners,
					},
					value,
				}
				.into(),
			),
			Command::Register { hackathon, stake } => (
				Some(parse_address("hackathon", &hackathon)?),
				RegisterParticipantParams {
					stake_amount: stake,
				}
				.into(),
			),
			Command::Score {
				hackathon,
				participant,
				score,
			} => (
				Some(parse_address("hackathon", &hackathon)?),
				SubmitScoreParams { participant, score }.into(),
			),
			Command::SubmitProject {
				hackathon,
				name,
				url,
			} => (
				Some(parse_address("hackathon", &hackathon)?),
				SubmitProjectParams {
					project_name: name,
					project_url: url,
				}
				.into(),
			),
			Command::Sponsor {
				hackathon,
				contribution,
			} => (
				Some(parse_address("hackathon", &hackathon)?),
				BecomeSponsorParams { contribution }.into(),
			),
		};
		Ok(operation)
	}
}

/// Main entry point for the DeHack client.
///
/// Parses arguments, initializes logging, loads configuration, runs the
/// requested operation and prints its result.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	let config = Config::from_file(&args.config).await?;
	tracing::info!("Loaded configuration [{}]", config.client.id);

	let client = ClientBuilder::new(config).with_alloy_delivery()?.build()?;

	let (hackathon, params) = args.command.into_operation()?;
	let kind = params.kind();
	let target = hackathon.unwrap_or_else(|| client.platform());

	let ticket = client.start(target, params, None)?;
	tracing::info!(kind = %kind, generation = ticket.generation, "Operation started");

	let result = ticket.outcome().await?;
	println!("{}", serde_json::to_string_pretty(&result)?);
	Ok(())
}
