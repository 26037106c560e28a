//! `agent0`: a deliberately simple agent. Every tank turns toward the
//! closest live enemy, drives at full speed and fires whenever it can.

use std::time::Duration;

use anyhow::{Context, Result};
use bzrflag_client::BzrcClient;
use clap::Parser;
use shared::protocol::{MyTank, OtherTank};
use shared::{normalize_angle, TankStatus};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Server host
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// The team's port
    #[arg(short, long)]
    port: u16,
    /// Milliseconds between decisions
    #[arg(short, long, default_value = "100")]
    interval: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut client = BzrcClient::connect((args.host.as_str(), args.port))
        .await
        .with_context(|| format!("connecting to {}:{}", args.host, args.port))?;
    info!(host = %args.host, port = args.port, "connected");

    let mut ticker = tokio::time::interval(Duration::from_millis(args.interval));
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => break,
        }
        let mine = client.mytanks().await?;
        let enemies = client.othertanks().await?;
        for tank in mine.iter().filter(|t| t.status == TankStatus::Alive) {
            let Some(target) = closest_enemy(tank, &enemies) else {
                continue;
            };
            let turn = steer(tank, target);
            debug!(callsign = %tank.callsign, target = %target.callsign, turn, "chasing");
            client.angvel(tank.index, turn).await?;
            client.speed(tank.index, 1.0).await?;
            client.shoot(tank.index).await?;
        }
    }

    client.quit().await?;
    info!("disconnected");
    Ok(())
}

fn closest_enemy<'a>(tank: &MyTank, enemies: &'a [OtherTank]) -> Option<&'a OtherTank> {
    enemies
        .iter()
        .filter(|e| e.status == TankStatus::Alive)
        .min_by(|a, b| {
            tank.pos
                .distance(a.pos)
                .total_cmp(&tank.pos.distance(b.pos))
        })
}

/// Angular velocity that turns `tank` toward `target`, in [-1, 1].
fn steer(tank: &MyTank, target: &OtherTank) -> f32 {
    let to_target = target.pos.sub(tank.pos);
    let bearing = to_target.y.atan2(to_target.x);
    (2.0 * normalize_angle(bearing - tank.angle)).clamp(-1.0, 1.0)
}
