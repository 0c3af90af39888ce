//! Example of driving the playground store directly from Rust.

use promptlab_core::{InputMode, OperationType, PlaygroundStore};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Create a store with the default chat instance
    let store = PlaygroundStore::new();

    // 2. Print every state change
    store.on_change(|state| {
        println!(
            "{} / {}: {} instance(s)",
            state.operation_type,
            state.input_mode,
            state.instances.len()
        );
    });
    store.on_ignored(|reason| println!("ignored: {reason}"));

    // 3. Build a two-instance comparison
    store.add_message(0);
    store.add_instance();
    store.add_instance(); // at the limit, ignored
    store.set_input_mode(InputMode::Dataset);

    // 4. Switching operation type starts over with one instance
    store.set_operation_type(OperationType::TextCompletion);
    store.add_message(0); // not a chat template, ignored

    println!("{}", serde_yaml::to_string(&store.snapshot())?);
    Ok(())
}
