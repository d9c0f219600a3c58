use std::fs::File;

use crate::domain::{Wallet, WorkloadEntry};
use crate::service::{boot, Services};

/// Where the orchestrator reads its workload from.
#[derive(Debug, Clone)]
pub enum WorkloadSource {
    Csv { file_path: String },
}

pub struct Orchestrator {
    services: Services,
    source: WorkloadSource,
}

impl Orchestrator {
    pub async fn new(source: WorkloadSource) -> Self {
        let services = boot().await;
        Self { services, source }
    }

    /// Create an Orchestrator over pre-built services.
    ///
    /// ## Warning: This is NOT MEANT FOR PRODUCTION USE. Only for testing purposes.
    pub fn with_services(services: Services, source: WorkloadSource) -> Self {
        Self { services, source }
    }

    pub async fn process(self) -> Result<Vec<Wallet>, Box<dyn std::error::Error>> {
        let WorkloadSource::Csv { file_path } = self.source.clone();
        self.process_csv(&file_path).await
    }

    async fn process_csv(self, file_path: &str) -> Result<Vec<Wallet>, Box<dyn std::error::Error>> {
        let Services {
            store,
            service,
            registry,
            jobs,
            ..
        } = self.services;

        // The workload carries its own validate rows, so nobody consumes the
        // published jobs here; drain them so the channel never backs up.
        let drain = tokio::spawn(async move {
            let mut jobs = jobs;
            while let Some(job) = jobs.recv().await {
                tracing::debug!(request = %job.request_id, "validation job published");
            }
        });

        let file_handle = File::open(file_path)?;
        let mut rdr = csv::Reader::from_reader(file_handle);

        let mut line_num = 0;

        for result in rdr.deserialize() {
            line_num += 1;
            let entry: WorkloadEntry = result?;

            let outcome = match entry {
                WorkloadEntry::Deposit(deposit) => service
                    .deposit(&deposit.user_id, deposit.amount)
                    .await
                    .map(|_| ()),
                WorkloadEntry::Command(command) => {
                    registry.process_command(command).await.map(|_| ())
                }
            };

            if let Err(e) = outcome {
                eprintln!("Error processing line {}: {}", line_num, e);
            }
        }

        // Give actors time to process all messages
        tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;

        registry.shutdown_all().await;
        drain.abort();

        Ok(store.all_wallets().await)
    }

    /// Output wallet balances as CSV to stdout, one row per user, sorted by
    /// user id.
    pub fn output_csv(wallets: &[Wallet]) -> Result<(), Box<dyn std::error::Error>> {
        let mut wtr = csv::Writer::from_writer(std::io::stdout());
        wtr.write_record(["user", "gems", "usd"])?;

        for wallet in wallets {
            wtr.write_record([
                wallet.user_id.as_str(),
                &wallet.gems.to_string(),
                &wallet.usd.to_string(),
            ])?;
        }

        wtr.flush()?;
        Ok(())
    }
}
