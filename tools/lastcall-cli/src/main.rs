//! `lastcall`: terminal client for the LastCall expiring-deals storefront.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use lastcall_client::inventory::{sections, TrackedProduct};
use lastcall_client::profile::{ProfileStore, UserProfile};
use lastcall_client::{
    AdminOrders, ApiClient, ClientConfig, InventorySession, LoadState, PushSubscription, Snapshot,
    SystemClock,
};
use lastcall_common::cart::Cart;
use lastcall_common::expiry::classify_product;
use lastcall_common::favorites::Favorites;
use lastcall_common::order::{Order, OrderId, CASH_ON_DELIVERY};
use lastcall_common::product::{Product, ProductId};

#[derive(Parser)]
#[command(name = "lastcall", about = "LastCall expiring-deals storefront client")]
struct Cli {
    /// Backend base URL.
    #[arg(long, env = "LASTCALL_BASE_URL", default_value = lastcall_client::config::DEFAULT_BASE_URL)]
    base_url: String,

    /// Push channel WebSocket URL (default: derived from --base-url).
    #[arg(long, env = "LASTCALL_PUSH_URL")]
    push_url: Option<String>,

    /// Products requested per page.
    #[arg(long, default_value_t = lastcall_client::config::DEFAULT_PAGE_SIZE)]
    page_size: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Live view of today's deals and upcoming offers.
    Watch {
        /// Print one snapshot after the first load and exit.
        #[arg(long)]
        once: bool,
        /// Only show products whose name contains this text.
        #[arg(long, default_value = "")]
        query: String,
        /// Do not subscribe to realtime updates.
        #[arg(long)]
        no_push: bool,
    },
    /// Every product in the catalog with its expiry bucket.
    Products,
    /// Watch list: the given products that have not expired yet.
    Favorites {
        #[arg(required = true)]
        ids: Vec<u64>,
    },
    /// Place an order for the saved user. Repeat an id to buy more than one.
    Checkout {
        #[arg(required = true)]
        ids: Vec<u64>,
        #[arg(long, default_value = CASH_ON_DELIVERY)]
        payment: String,
    },
    /// AI health analysis of one product.
    Analyze { id: u64 },
    /// Orders placed by a user (default: the saved profile).
    Orders {
        #[arg(long)]
        user: Option<u64>,
    },
    /// Admin order lists.
    AdminOrders {
        /// Show confirmed orders instead of today's.
        #[arg(long)]
        confirmed: bool,
    },
    /// Details of one order.
    Order { id: u64 },
    /// Mark an order as delivered.
    Confirm { id: u64 },
    /// Sales report summary.
    Sales {
        /// Months of history to show.
        #[arg(long, default_value_t = 6)]
        months: usize,
    },
    /// Save the signed-in user locally.
    Login {
        #[arg(long)]
        id: u64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        role: Option<String>,
        /// Contact number for deliveries.
        #[arg(long)]
        phone: Option<String>,
        /// Delivery address.
        #[arg(long)]
        address: Option<String>,
    },
    /// Forget the saved user.
    Logout,
    /// Show the saved user.
    Whoami,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::new(&cli.base_url);
    config.page_size = cli.page_size.max(1);
    if let Some(push_url) = &cli.push_url {
        config = config.with_push_url(push_url);
    }

    match cli.command {
        Command::Watch {
            once,
            query,
            no_push,
        } => watch(config, once, &query, no_push).await,
        Command::Products => products(&config).await,
        Command::Favorites { ids } => favorites(&config, &ids).await,
        Command::Checkout { ids, payment } => checkout(&config, &ids, &payment).await,
        Command::Analyze { id } => analyze(&config, id).await,
        Command::Orders { user } => orders(&config, user).await,
        Command::AdminOrders { confirmed } => {
            let which = if confirmed {
                AdminOrders::Confirmed
            } else {
                AdminOrders::Today
            };
            let api = ApiClient::new(&config)?;
            let orders = api.admin_orders(which).await?;
            print_orders(&orders);
            Ok(())
        }
        Command::Order { id } => {
            let api = ApiClient::new(&config)?;
            let order = api.order_details(OrderId(id)).await?;
            print_order_details(&order);
            Ok(())
        }
        Command::Confirm { id } => {
            let api = ApiClient::new(&config)?;
            api.confirm_delivery(OrderId(id)).await?;
            println!("Order #{id} marked as delivered");
            Ok(())
        }
        Command::Sales { months } => sales(&config, months).await,
        Command::Login {
            id,
            name,
            email,
            role,
            phone,
            address,
        } => {
            let store = ProfileStore::default_location()?;
            store.save(&UserProfile {
                id,
                name,
                email,
                role,
                phone,
                address,
            })?;
            Ok(())
        }
        Command::Logout => {
            ProfileStore::default_location()?.clear()?;
            println!("Signed out");
            Ok(())
        }
        Command::Whoami => {
            match ProfileStore::default_location()?.load()? {
                Some(profile) => println!("{}", serde_json::to_string_pretty(&profile)?),
                None => println!("Not signed in"),
            }
            Ok(())
        }
    }
}

async fn watch(config: ClientConfig, once: bool, query: &str, no_push: bool) -> Result<()> {
    let api = ApiClient::new(&config)?;
    let push = (!no_push).then(|| {
        let url = config
            .push_url
            .clone()
            .unwrap_or_else(|| config.default_push_url());
        PushSubscription::connect(url, config.reconnect_min, config.reconnect_max)
    });

    let handle = InventorySession::spawn(config, api, push, SystemClock);
    let mut snapshots = handle.subscribe();

    if once {
        let snapshot = snapshots
            .wait_for(|s| {
                matches!(s.load, LoadState::Failed(_))
                    || (s.load == LoadState::Loaded
                        && s.entries.iter().all(|e| e.classification.is_some()))
            })
            .await
            .context("session ended before the first load")?
            .clone();
        handle.shutdown().await?;
        if let LoadState::Failed(message) = &snapshot.load {
            bail!("loading products failed: {message}");
        }
        render(&snapshot, query);
        return Ok(());
    }

    info!("Watching deals; press Ctrl-C to stop");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if snapshot.load == LoadState::Loaded && snapshot.has_more {
                    handle.load_more();
                }
                render(&snapshot, query);
            }
        }
    }
    handle.shutdown().await?;
    Ok(())
}

fn render(snapshot: &Snapshot, query: &str) {
    let split = sections(&snapshot.entries, query);
    let sampled = snapshot
        .sampled_at
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".into());
    let link = if snapshot.push_connected {
        "live"
    } else {
        "offline"
    };

    println!();
    println!("=== {sampled} [{link}] {} product(s) ===", snapshot.entries.len());
    println!("Today Only");
    for entry in &split.today_only {
        print_deal(entry);
    }
    println!("Upcoming Offers");
    for entry in &split.upcoming {
        print_deal(entry);
    }
    if let LoadState::Failed(message) = &snapshot.load {
        println!("(load failed: {message})");
    }
}

fn print_deal(entry: &TrackedProduct) {
    let product = &entry.product;
    let (badge, countdown) = match &entry.classification {
        Some(c) => (
            c.bucket.badge().unwrap_or(""),
            c.countdown.map(|d| d.to_string()).unwrap_or_default(),
        ),
        None => ("", String::new()),
    };
    println!(
        "  {:>6}  {:<28} {:>14}  {:>16}  {badge}",
        product.code.as_str(),
        product.name,
        product.effective_price().to_string(),
        countdown,
    );
}

async fn products(config: &ClientConfig) -> Result<()> {
    let api = ApiClient::new(config)?;
    let now = Utc::now();
    for product in api.fetch_all_products().await? {
        let class = classify_product(now, &product);
        println!(
            "{:>6}  {:<28} {:>14}  {}",
            product.code.as_str(),
            product.name,
            product.effective_price().to_string(),
            class.bucket,
        );
    }
    Ok(())
}

fn find_product(catalog: &[Product], id: u64) -> Result<Product> {
    catalog
        .iter()
        .find(|p| p.id == ProductId(id))
        .cloned()
        .with_context(|| format!("no product with id {id}"))
}

async fn favorites(config: &ClientConfig, ids: &[u64]) -> Result<()> {
    let api = ApiClient::new(config)?;
    let catalog = api.fetch_all_products().await?;
    let mut favorites = Favorites::new();
    for &id in ids {
        favorites.insert(find_product(&catalog, id)?);
    }

    let now = Utc::now();
    let expired = favorites.prune_expired(now);
    if expired > 0 {
        println!("{expired} favorite(s) expired and were dropped");
    }
    for product in favorites.iter() {
        let class = classify_product(now, product);
        println!(
            "{:>6}  {:<28} {:>14}  {:>16}  {}",
            product.code.as_str(),
            product.name,
            product.effective_price().to_string(),
            class.countdown.map(|d| d.to_string()).unwrap_or_default(),
            class.bucket.badge().unwrap_or(""),
        );
    }
    Ok(())
}

async fn checkout(config: &ClientConfig, ids: &[u64], payment: &str) -> Result<()> {
    let profile = ProfileStore::default_location()?
        .load()?
        .context("no saved profile; run `lastcall login` first")?;
    let api = ApiClient::new(config)?;
    let catalog = api.fetch_all_products().await?;

    let mut cart = Cart::new();
    for &id in ids {
        cart.insert(find_product(&catalog, id)?);
    }
    for line in cart.lines() {
        println!(
            "  {:>3} x {:<28} {:>14}",
            line.quantity,
            line.product.name,
            line.line_total().to_string()
        );
    }
    let summary = cart.checkout_summary();
    println!("Subtotal:  {}", summary.subtotal);
    println!("Delivery:  {}", summary.delivery_fee);
    println!("Discount: -{}", summary.discount);
    println!("Total:     {}", summary.grand_total);

    let id = api.create_order(&cart, &profile, payment).await?;
    println!("Order #{id} placed");
    Ok(())
}

async fn analyze(config: &ClientConfig, id: u64) -> Result<()> {
    let api = ApiClient::new(config)?;
    let analysis = api.analyze_product(ProductId(id)).await?;
    if let Some(name) = analysis.product.as_ref().and_then(|p| p.name.as_deref()) {
        println!("{name}");
    }
    println!("Health score: {}/100 ({})", analysis.health_score, analysis.rating());
    println!("{}", analysis.summary());
    Ok(())
}

async fn orders(config: &ClientConfig, user: Option<u64>) -> Result<()> {
    let user_id = match user {
        Some(id) => id,
        None => ProfileStore::default_location()?
            .load()?
            .map(|p| p.id)
            .context("no --user given and no saved profile; run `lastcall login` first")?,
    };
    let api = ApiClient::new(config)?;
    let orders = api.user_orders(user_id).await?;
    print_orders(&orders);
    Ok(())
}

fn print_orders(orders: &[Order]) {
    if orders.is_empty() {
        println!("No orders");
        return;
    }
    for order in orders {
        let customer = order.customer_name.as_deref().unwrap_or("-");
        println!(
            "#{:<6} {:<10} {:<20} {:>3} item(s)  {}",
            order.id.to_string(),
            order.status.to_string(),
            customer,
            order.item_count(),
            order.total_amount,
        );
    }
}

fn print_order_details(order: &Order) {
    println!("Order #{} ({})", order.id, order.status);
    if let Some(placed) = &order.created_at {
        println!("Placed:   {placed}");
    }
    if let Some(name) = &order.customer_name {
        println!("Customer: {name}");
    }
    if let Some(address) = &order.customer_address {
        println!("Address:  {address}");
    }
    if let Some(number) = &order.customer_number {
        println!("Phone:    {number}");
    }
    println!("Payment:  {}", order.payment_method);
    for item in order.items.iter() {
        println!(
            "  {:>3} x {:<28} {:>14}",
            item.quantity,
            item.product_name,
            item.line_total().to_string()
        );
    }
    println!("Total:    {}", order.total_amount);
}

async fn sales(config: &ClientConfig, months: usize) -> Result<()> {
    let api = ApiClient::new(config)?;
    let report = api.sales_report().await?;
    let summary = &report.summary;
    println!("Total sales:     {}", summary.total_sales);
    println!("Orders:          {}", summary.total_orders);
    println!("Items sold:      {}", summary.total_items);
    println!("Avg order value: {}", report.average_order_value());

    println!("Monthly");
    for month in report.recent_months(months) {
        println!("  {:<10} {}", month.month, month.monthly_sales);
    }
    println!("Best sellers");
    for best in &report.best_selling_products {
        println!("  {:<28} {}", best.product_name, best.total_sold);
    }
    Ok(())
}
