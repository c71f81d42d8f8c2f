//! Unload/reload example: a campsite left alone for a day.
//!
//! Lights a firepit, seals a barrel of cucumbers in brine, walks away for a
//! game day, and comes back. Everything that happened in between is
//! reconstructed in one calendar update per device.
//!
//! Run with: `RUST_LOG=debug cargo run -p hearth-core --example unload_reload`

use hearth_core::clock::{TICKS_IN_DAY, TICKS_IN_HOUR};
use hearth_core::config::HearthConfig;
use hearth_core::device::DeviceKind;
use hearth_core::event::{Event, EventKind};
use hearth_core::item::{FluidStack, ItemStack};
use hearth_core::recipe::{FluidIngredient, ItemIngredient, ItemOutput, RecipeDuration, SealedRecipe};
use hearth_core::registry::{FuelDef, Registry, RegistryBuilder};
use hearth_core::world::World;

fn build_registry() -> Registry {
    let mut b = RegistryBuilder::new();
    let log = b.register_item("log", 16);
    let cucumber = b.register_item("cucumber", 64);
    let brine = b.register_fluid("brine");
    let brined = b.register_trait("brined");
    b.register_fuel(FuelDef {
        name: "log".into(),
        item: Some(log),
        burn_duration: 1500,
        burn_temperature: 750.0,
        purity: 0.6,
    });
    b.register_sealed_recipe(SealedRecipe {
        name: "brining".into(),
        input_item: Some(ItemIngredient {
            items: vec![cucumber],
            required_traits: vec![],
            forbidden_traits: vec![brined],
            count: 1,
        }),
        input_fluid: Some(FluidIngredient {
            fluid: brine,
            amount: 100,
        }),
        output_item: ItemOutput::CopyInput {
            add_traits: vec![brined],
            remove_traits: vec![],
        },
        output_fluid: None,
        duration: RecipeDuration::Finite(4 * TICKS_IN_HOUR),
        on_seal: vec![],
        on_unseal: vec![],
    });
    b.build().expect("registry should be valid")
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let registry = build_registry();
    let log = registry.item_id("log").expect("log is registered");
    let cucumber = registry.item_id("cucumber").expect("cucumber is registered");
    let brine = registry.fluid_id("brine").expect("brine is registered");
    let mut world = World::new(registry, HearthConfig::default());

    // --- Step 1: Set up camp ---

    let pit = world.place(DeviceKind::Firepit);
    for _ in 0..3 {
        world.add_fuel_item(pit, log).expect("firepit takes logs");
    }
    world.ignite(pit).expect("firepit has fuel");

    let barrel = world.place(DeviceKind::Barrel);
    world
        .interact(barrel, |device, ctx| {
            let barrel = device.as_barrel_mut().expect("placed a barrel");
            barrel
                .insert_item(ItemStack::new(cucumber, 16), ctx)
                .expect("barrel is open");
            barrel
                .fill(FluidStack::new(brine, 4_000), ctx)
                .expect("barrel is open");
            barrel.seal(ctx)
        })
        .expect("barrel exists");

    world.run(600);
    println!(
        "Tick {}: firepit at {:.0} degrees",
        world.now(),
        world.device(pit).and_then(|d| d.temperature()).unwrap_or(0.0)
    );

    // --- Step 2: Walk away ---

    world.unload(pit).expect("pit exists");
    world.unload(barrel).expect("barrel exists");
    world.advance_unloaded(TICKS_IN_DAY);
    println!("Away for {TICKS_IN_DAY} ticks; now at tick {}", world.now());

    // --- Step 3: Come back ---

    for id in [pit, barrel] {
        let elapsed = world.load(id).expect("device exists");
        println!("Reloaded {id:?}, caught up {elapsed} ticks");
    }

    let describe = |event: &Event| {
        format!(
            "{:?} at tick {}{}",
            event.kind(),
            event.tick(),
            if event.is_retroactive() { " (while away)" } else { "" }
        )
    };
    for kind in [
        EventKind::FuelConsumed,
        EventKind::Extinguished,
        EventKind::RecipeCompleted,
    ] {
        for event in world.event_bus.events(kind) {
            println!("  {}", describe(event));
        }
    }

    let pit_state = world.device(pit).expect("pit exists");
    println!(
        "Firepit: {:.0} degrees, lit = {}",
        pit_state.temperature().unwrap_or(0.0),
        pit_state.heater().is_some_and(|h| h.is_lit())
    );
    if let Some(contents) = world
        .device(barrel)
        .and_then(|d| d.as_barrel())
        .map(|b| b.contents())
    {
        println!("Barrel: {:?}, {:?}", contents.item, contents.fluid);
    }
}
