use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::task;

use crate::{
    api::{budget_thuis, nutsservices},
    cli::provider::ProviderArgs,
    prelude::*,
    tables::{build_contracts_table, build_tariffs_table},
};

#[derive(Parser)]
pub struct BurrowArgs {
    #[clap(flatten)]
    provider: ProviderArgs,

    #[command(subcommand)]
    command: BurrowCommand,
}

#[derive(Subcommand)]
enum BurrowCommand {
    /// Print the logged-in user's claims.
    UserInfo,

    /// List all the contracts.
    Contracts,

    /// List the hourly tariffs of the dynamic contracts.
    Tariffs {
        /// Specific contract, even if it is not dynamic.
        #[clap(long = "contract-id")]
        contract_id: Option<u64>,
    },
}

impl BurrowArgs {
    pub async fn run(self) -> Result {
        let access_token = self.provider.guardian()?.check_and_refresh_token().await?;

        match self.command {
            BurrowCommand::UserInfo => {
                let api = budget_thuis::Api::new(
                    self.provider.accounts_url.clone(),
                    &access_token,
                    self.provider.retry(),
                );
                let user_info = task::spawn_blocking(move || api.get_user_info()).await??;
                println!("{}", serde_json::to_string_pretty(&*user_info)?);
            }

            BurrowCommand::Contracts => {
                let api = self.nutsservices(&access_token);
                let contracts = task::spawn_blocking(move || api.all_contracts()).await??;
                println!("{}", build_contracts_table(&contracts));
            }

            BurrowCommand::Tariffs { contract_id } => {
                let api = Arc::new(self.nutsservices(&access_token));
                let contract_ids = match contract_id {
                    Some(contract_id) => vec![contract_id],
                    None => {
                        let api = api.clone();
                        task::spawn_blocking(move || api.all_contracts())
                            .await??
                            .into_iter()
                            .filter(|contract| contract.is_dynamic())
                            .map(|contract| contract.id)
                            .collect()
                    }
                };
                for contract_id in contract_ids {
                    let api = api.clone();
                    let tariffs =
                        task::spawn_blocking(move || api.hourly_tariff(contract_id)).await??;
                    println!("Contract #{contract_id}:");
                    println!("{}", build_tariffs_table(&tariffs, Utc::now()));
                }
            }
        }

        Ok(())
    }

    fn nutsservices(&self, access_token: &str) -> nutsservices::Api {
        nutsservices::Api::new(
            self.provider.nutsservices_url.clone(),
            access_token,
            self.provider.retry(),
        )
    }
}
