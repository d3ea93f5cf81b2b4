use std::fs::File;
use std::io::{BufReader, Write};
use std::rc::Rc;

use anyhow::Context;
use widget_fetch::HttpClient;
use widget_store::fetch::HttpRequestHandler;
use widget_store::flux::ActionEnvelope;
use widget_store::{Config, Replay, init_logging};

fn main() -> anyhow::Result<()> {
    let config = Config::new()?;

    init_logging(config.config_path())?;

    let script = File::open(config.script()).context("failed to open the script")?;
    let reader = BufReader::new(script);

    let actions: Vec<ActionEnvelope> = serde_json::from_reader(reader).context("failed to parse the script")?;

    if actions.is_empty() {
        anyhow::bail!("Got a script with zero actions, nothing to replay here")
    }

    let fetcher = HttpRequestHandler::new(HttpClient::new(config.timeout()));
    let mut replay = Replay::new(Rc::new(fetcher), config.wait());
    replay.subscribe().context("failed to subscribe to the stores")?;

    let snapshot = replay.run(actions).context("error during replay")?;

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &snapshot).context("failed to print the snapshot")?;
    writeln!(stdout).context("failed to print the snapshot")
}
