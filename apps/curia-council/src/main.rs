//! Boots a nine-member council on localhost and walks it through three
//! elections, resetting state between scenarios. Members 1-3 get fixed
//! behavior profiles so every run exercises the delayed paths; the rest are
//! assigned randomly with a bias away from the silent profile.

use curia_paxos::{AddressBook, CouncilConfig, CouncilMember, MemberBehavior, MemberId};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

const COUNCIL_SIZE: u32 = 9;
const BASE_PORT: u16 = 5001;

fn assign_behavior(id: u32, rng: &mut impl Rng) -> MemberBehavior {
    match id {
        1 => MemberBehavior::ImmediateResponse,
        2 => MemberBehavior::LargeDelay,
        3 => MemberBehavior::SmallDelay,
        _ => {
            let all = [
                MemberBehavior::ImmediateResponse,
                MemberBehavior::SmallDelay,
                MemberBehavior::LargeDelay,
                MemberBehavior::NoResponse,
            ];
            let mut behavior = all[rng.gen_range(0..all.len())];
            // Re-roll a silent profile half the time so most runs keep a
            // comfortable quorum of responsive members.
            if behavior == MemberBehavior::NoResponse && rng.gen_bool(0.5) {
                behavior = all[rng.gen_range(0..all.len())];
            }
            behavior
        }
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = CouncilConfig::new(AddressBook::localhost(COUNCIL_SIZE, BASE_PORT));

    let mut rng = rand::thread_rng();
    let mut members = Vec::new();
    for id in 1..=COUNCIL_SIZE {
        let behavior = assign_behavior(id, &mut rng);
        tracing::info!(member = id, %behavior, "starting council member");

        let member = Arc::new(
            CouncilMember::bind(MemberId(id), behavior, config.clone()).await?,
        );
        member.listen();
        members.push(member);
    }

    // Give every listener a moment before proposals start flying.
    tokio::time::sleep(Duration::from_secs(2)).await;

    for (scenario, proposer) in [(1u32, 1u32), (2, 2), (3, 3)] {
        tracing::info!(scenario, proposer, "=== running election scenario ===");

        let value = format!("Member {}", proposer);
        let outcome = members[proposer as usize - 1].start_election(value).await;
        tracing::info!(scenario, ?outcome, "election finished");

        // Let propagation settle, then report what each member learned.
        tokio::time::sleep(Duration::from_secs(2)).await;
        for member in &members {
            tracing::info!(
                member = member.id().as_u32(),
                accepted = ?member.accepted_value(),
                "scenario result"
            );
        }

        for member in &members {
            member.reset();
        }
    }

    for member in &members {
        member.shutdown();
    }
    tracing::info!("council shut down");
    Ok(())
}
