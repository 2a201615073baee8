//! Command line front for browsing rooms and pricing stays against a running
//! storefront backend.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context as _};
use clap::{Parser, Subcommand};
use futures::future;
use tracing as log;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter};

use villa_storefront::dates::{nights_label, StayRange};
use villa_storefront::pricing::format_price_label;
use villa_storefront::{
    CachedCatalog, PriceQuote, ResultView, RoomCatalog, RoomSearch, SortOption,
    StorefrontClient, StorefrontConfig,
};

// Amenities shown per room in listings
const AMENITY_PREVIEW: usize = 5;

/// Villa storefront client.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Lists rooms matching the given filters.
    Rooms {
        /// Room type to include; repeat for several.
        #[arg(long = "room-type")]
        room_types: Vec<String>,

        /// Price range such as "0 to 5000"; repeat for several.
        #[arg(long = "price-range")]
        price_ranges: Vec<String>,

        /// One of "Price Low to High", "Price High to Low", "Newest First".
        #[arg(long)]
        sort: Option<SortOption>,
    },

    /// Prices a stay for one or more rooms.
    Quote {
        /// Room identifiers.
        #[arg(required = true)]
        room_ids: Vec<String>,

        /// Check-in date (YYYY-MM-DD).
        #[arg(long)]
        check_in: String,

        /// Check-out date (YYYY-MM-DD).
        #[arg(long)]
        check_out: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let config = StorefrontConfig::load(args.config.as_deref())
        .context("failed to load `StorefrontConfig`")?;
    let client = StorefrontClient::new(&config).context("failed to build HTTP client")?;

    match args.command {
        Command::Rooms {
            room_types,
            price_ranges,
            sort,
        } => list_rooms(client, room_types, price_ranges, sort).await,
        Command::Quote {
            room_ids,
            check_in,
            check_out,
        } => quote_rooms(client, &config, &room_ids, &check_in, &check_out).await,
    }
}

async fn list_rooms(
    client: StorefrontClient,
    room_types: Vec<String>,
    price_ranges: Vec<String>,
    sort: Option<SortOption>,
) -> anyhow::Result<()> {
    let search = RoomSearch::new(Arc::new(client));

    // Only the last change needs to be fetched; earlier ones are superseded
    let mut pending = Vec::new();
    for room_type in &room_types {
        pending.push(search.issue(|c| c.set_room_type(room_type, true).map(drop))?);
    }
    for range in &price_ranges {
        pending.push(search.issue(|c| c.set_price_range(range, true).map(drop))?);
    }
    log::debug!(changes = pending.len(), "filters applied");

    search.select_sort(sort).await;

    match search.view() {
        ResultView::Loaded { rooms, .. } if rooms.is_empty() => {
            println!("No rooms match the selected filters.");
        }
        ResultView::Loaded { rooms, .. } => {
            for room in &rooms {
                println!(
                    "{:<26} {:<16} ₹{}/night  {} ({})",
                    room.id,
                    room.room_type,
                    format_price_label(&room.price_per_night),
                    room.hotel.name,
                    room.hotel.city,
                );
                let amenities = room.preview_amenities(AMENITY_PREVIEW);
                if !amenities.is_empty() {
                    println!("{:<26} {}", "", amenities.join(" · "));
                }
            }
        }
        ResultView::Failed { error, .. } => bail!("room search failed: {error}"),
        other => bail!("room search did not complete: {other:?}"),
    }

    Ok(())
}

async fn quote_rooms(
    client: StorefrontClient,
    config: &StorefrontConfig,
    room_ids: &[String],
    check_in: &str,
    check_out: &str,
) -> anyhow::Result<()> {
    let stay = StayRange::resolve_raw(Some(check_in), Some(check_out))?;
    if !stay.is_complete() {
        bail!("check-out must be after check-in");
    }

    let catalog = CachedCatalog::new(client, &config.room_cache);
    let rooms = future::join_all(room_ids.iter().map(|id| catalog.get_by_id(id))).await;

    for (id, room) in room_ids.iter().zip(rooms) {
        let room = match room {
            Ok(room) => room,
            Err(e) => {
                log::error!(room_id = %id, "failed to load room: {e}");
                continue;
            }
        };

        let quote = PriceQuote::for_display(&room.price_per_night, stay.nights(), config.tax_rate);
        let (base, tax, total) = quote.breakdown().formatted();
        println!("{} · {} · {}", room.room_type, room.hotel.name, nights_label(stay.nights()));
        println!("  Room charge     ₹{base}");
        println!("  Taxes & fees    ₹{tax}");
        println!("  Total           ₹{total}");
    }

    Ok(())
}
