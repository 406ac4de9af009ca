mod loader;
mod validation;

pub use loader::{
    load_and_validate_recipe, load_recipe, load_recipes, ProcessorRecipe, Recipe, SinkRecipe,
    SourceRecipe,
};
pub use validation::validate_recipe;
