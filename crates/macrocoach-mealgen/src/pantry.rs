//! Offline meal generation from a built-in Turkish pantry.
//!
//! Nutrition is tabulated per 100 g. A template lists fixed ingredient
//! amounts; the generator scales every amount by the same factor so the
//! meal's kcal lands on the envelope. Protein, carbs and fat follow the
//! template's proportions.

use std::convert::Infallible;

use macrocoach_core::{
  generate::{GenerationRequest, MealCandidate, MealGenerator},
  meal::{Ingredient, MealType},
  target::Macros,
};

// ─── Ingredient table ────────────────────────────────────────────────────────

struct PantryItem {
  name:     &'static str,
  per_100g: Macros,
  /// Grams per `adet` (piece), for items counted rather than weighed.
  piece_g:  Option<f64>,
}

const fn item(name: &'static str, kcal: f64, protein_g: f64, carbs_g: f64, fat_g: f64) -> PantryItem {
  PantryItem { name, per_100g: Macros { kcal, protein_g, carbs_g, fat_g }, piece_g: None }
}

const PANTRY: &[PantryItem] = &[
  // Grains and legumes
  item("bulgur", 342.0, 12.0, 76.0, 1.3),
  item("kuru fasulye", 333.0, 21.0, 60.0, 1.1),
  item("mercimek", 353.0, 24.0, 60.0, 1.1),
  item("nohut", 364.0, 19.0, 61.0, 6.0),
  item("pirinç", 365.0, 7.0, 78.0, 0.7),
  // Proteins
  item("tavuk göğsü", 165.0, 31.0, 0.0, 3.6),
  item("dana eti", 250.0, 26.0, 0.0, 15.0),
  item("balık", 120.0, 22.0, 0.0, 4.0),
  PantryItem {
    name:     "yumurta",
    per_100g: Macros { kcal: 155.0, protein_g: 13.0, carbs_g: 1.1, fat_g: 11.0 },
    piece_g:  Some(50.0),
  },
  item("lor peyniri", 98.0, 11.0, 4.0, 4.0),
  item("beyaz peynir", 264.0, 17.0, 1.0, 21.0),
  // Vegetables
  item("domates", 18.0, 0.9, 3.9, 0.2),
  item("salatalık", 16.0, 0.7, 3.6, 0.1),
  item("soğan", 40.0, 1.1, 9.3, 0.1),
  item("biber", 31.0, 1.0, 6.0, 0.3),
  item("patlıcan", 25.0, 1.0, 6.0, 0.2),
  item("kabak", 17.0, 1.2, 7.0, 0.1),
  // Fats and nuts
  item("zeytinyağı", 884.0, 0.0, 0.0, 100.0),
  item("tereyağı", 717.0, 0.9, 0.1, 81.0),
  item("ceviz", 654.0, 15.0, 14.0, 65.0),
  item("badem", 579.0, 21.0, 22.0, 49.0),
];

fn lookup(name: &str) -> Option<&'static PantryItem> {
  let name = name.trim().to_lowercase();
  PANTRY.iter().find(|i| i.name == name)
}

/// Convert an amount to grams. `None` for units that cannot be converted
/// for this ingredient.
fn grams(item: &PantryItem, amount: f64, unit: &str) -> Option<f64> {
  match unit.trim().to_lowercase().as_str() {
    "g" | "gr" | "ml" => Some(amount),
    "kg" => Some(amount * 1000.0),
    "adet" | "piece" | "pc" => item.piece_g.map(|g| amount * g),
    "su bardağı" => Some(amount * 200.0),
    "çay bardağı" => Some(amount * 100.0),
    _ => None,
  }
}

/// Nutrition of a list of ingredients. Ingredients that are not in the
/// pantry, or whose unit cannot be converted, contribute nothing.
pub fn nutrition(ingredients: &[Ingredient]) -> Macros {
  ingredients
    .iter()
    .filter_map(|ing| {
      let item = lookup(&ing.name)?;
      let g = grams(item, ing.amount, &ing.unit)?;
      Some(item.per_100g.scaled(g / 100.0))
    })
    .sum()
}

// ─── Templates ───────────────────────────────────────────────────────────────

struct Template {
  name:         &'static str,
  meal_type:    MealType,
  /// Contains meat or fish.
  meat:         bool,
  ingredients:  &'static [(&'static str, f64, &'static str)],
  instructions: &'static [&'static str],
}

const TEMPLATES: &[Template] = &[
  Template {
    name:         "Menemen with Cheese",
    meal_type:    MealType::Breakfast,
    meat:         false,
    ingredients:  &[
      ("yumurta", 2.0, "adet"),
      ("domates", 100.0, "g"),
      ("biber", 50.0, "g"),
      ("beyaz peynir", 30.0, "g"),
      ("zeytinyağı", 5.0, "g"),
    ],
    instructions: &[
      "Chop the tomatoes and peppers.",
      "Soften them in olive oil over medium heat.",
      "Stir in the eggs until just set.",
      "Crumble the cheese over the top.",
    ],
  },
  Template {
    name:         "Lor Cheese with Walnuts and Cucumber",
    meal_type:    MealType::Breakfast,
    meat:         false,
    ingredients:  &[
      ("lor peyniri", 150.0, "g"),
      ("ceviz", 20.0, "g"),
      ("salatalık", 100.0, "g"),
      ("domates", 100.0, "g"),
    ],
    instructions: &["Slice the vegetables.", "Serve the lor topped with crushed walnuts."],
  },
  Template {
    name:         "Grilled Chicken with Bulgur",
    meal_type:    MealType::Lunch,
    meat:         true,
    ingredients:  &[
      ("tavuk göğsü", 150.0, "g"),
      ("bulgur", 80.0, "g"),
      ("domates", 100.0, "g"),
      ("salatalık", 100.0, "g"),
      ("zeytinyağı", 10.0, "g"),
    ],
    instructions: &[
      "Marinate the chicken breast.",
      "Simmer the bulgur until tender.",
      "Grill the chicken.",
      "Dress the tomato and cucumber salad with olive oil.",
    ],
  },
  Template {
    name:         "Chickpeas with Rice",
    meal_type:    MealType::Lunch,
    meat:         false,
    ingredients:  &[
      ("nohut", 80.0, "g"),
      ("pirinç", 60.0, "g"),
      ("domates", 100.0, "g"),
      ("soğan", 50.0, "g"),
      ("zeytinyağı", 10.0, "g"),
    ],
    instructions: &[
      "Soak and boil the chickpeas.",
      "Cook them with onion and tomato in olive oil.",
      "Serve over steamed rice.",
    ],
  },
  Template {
    name:         "Baked Fish with Vegetables",
    meal_type:    MealType::Dinner,
    meat:         true,
    ingredients:  &[
      ("balık", 200.0, "g"),
      ("kabak", 150.0, "g"),
      ("biber", 50.0, "g"),
      ("pirinç", 50.0, "g"),
      ("zeytinyağı", 10.0, "g"),
    ],
    instructions: &[
      "Lay the fish on sliced zucchini and peppers.",
      "Drizzle with olive oil and bake at 200 °C for 20 minutes.",
      "Serve with rice.",
    ],
  },
  Template {
    name:         "Red Lentil Stew",
    meal_type:    MealType::Dinner,
    meat:         false,
    ingredients:  &[
      ("mercimek", 90.0, "g"),
      ("soğan", 60.0, "g"),
      ("domates", 100.0, "g"),
      ("bulgur", 30.0, "g"),
      ("tereyağı", 10.0, "g"),
    ],
    instructions: &[
      "Sauté the onion in butter.",
      "Add lentils, bulgur, tomato and water.",
      "Simmer for 25 minutes.",
    ],
  },
  Template {
    name:         "Beef and Eggplant Stew",
    meal_type:    MealType::Dinner,
    meat:         true,
    ingredients:  &[
      ("dana eti", 120.0, "g"),
      ("patlıcan", 200.0, "g"),
      ("domates", 100.0, "g"),
      ("soğan", 50.0, "g"),
      ("zeytinyağı", 5.0, "g"),
    ],
    instructions: &[
      "Brown the beef with onion.",
      "Add cubed eggplant and tomato.",
      "Braise until the beef is tender.",
    ],
  },
  Template {
    name:         "Almonds and Walnuts",
    meal_type:    MealType::Snack,
    meat:         false,
    ingredients:  &[("badem", 20.0, "g"), ("ceviz", 15.0, "g")],
    instructions: &["Portion the nuts into a bowl."],
  },
  Template {
    name:         "Boiled Eggs with Tomato",
    meal_type:    MealType::Snack,
    meat:         false,
    ingredients:  &[("yumurta", 2.0, "adet"), ("domates", 100.0, "g")],
    instructions: &["Boil the eggs for 9 minutes.", "Serve with sliced tomato."],
  },
];

fn is_meatless(tags: &[String]) -> bool {
  tags.iter().any(|t| {
    matches!(
      t.trim().to_lowercase().as_str(),
      "vegetarian" | "vegan" | "meatless" | "vejetaryen"
    )
  })
}

// ─── Generator ───────────────────────────────────────────────────────────────

/// Deterministic generator over the built-in templates. Returns one
/// candidate per requested meal type.
#[derive(Debug, Clone, Default)]
pub struct PantryGenerator;

impl PantryGenerator {
  pub const NAME: &'static str = "pantry";

  pub fn new() -> Self { Self }

  /// Build candidates synchronously; the [`MealGenerator`] impl wraps this.
  pub fn candidates(&self, request: &GenerationRequest) -> Vec<MealCandidate> {
    let meatless = is_meatless(&request.dietary_tags);
    let avoided = |t: &Template| request.avoid.iter().any(|a| a.eq_ignore_ascii_case(t.name));

    let mut used: Vec<&'static str> = Vec::new();
    request
      .meal_types
      .iter()
      .filter_map(|&meal_type| {
        // Narrow the pool step by step, but never to nothing.
        let of_type: Vec<&Template> =
          TEMPLATES.iter().filter(|t| t.meal_type == meal_type).collect();
        let allowed = narrow(of_type, |t| !(meatless && t.meat));
        let allowed = narrow(allowed, |t| !avoided(t));
        let fresh = narrow(allowed, |t| !used.contains(&t.name));

        let template = fresh.first().copied()?;
        used.push(template.name);
        Some(build(template, request.envelope.kcal, request.cuisine_tags.first()))
      })
      .collect()
  }
}

/// Keep the elements matching `keep`, unless that would leave none.
fn narrow<'t>(pool: Vec<&'t Template>, keep: impl Fn(&Template) -> bool) -> Vec<&'t Template> {
  let kept: Vec<&Template> = pool.iter().copied().filter(|t| keep(t)).collect();
  if kept.is_empty() { pool } else { kept }
}

fn build(template: &Template, target_kcal: f64, cuisine: Option<&String>) -> MealCandidate {
  let base: Vec<Ingredient> = template
    .ingredients
    .iter()
    .map(|&(name, amount, unit)| Ingredient { name: name.into(), amount, unit: unit.into() })
    .collect();
  let base_macros = nutrition(&base);

  let factor = if base_macros.kcal > 0.0 && target_kcal > 0.0 {
    target_kcal / base_macros.kcal
  } else {
    1.0
  };

  let ingredients = base
    .into_iter()
    .map(|i| Ingredient { amount: round_amount(i.amount * factor, &i.unit), ..i })
    .collect::<Vec<_>>();

  MealCandidate {
    name:         template.name.into(),
    meal_type:    template.meal_type,
    macros:       base_macros.scaled(factor),
    cuisine:      Some(cuisine.cloned().unwrap_or_else(|| "turkish".into())),
    ingredients,
    instructions: template.instructions.iter().map(|s| (*s).to_owned()).collect(),
  }
}

/// Pieces to the nearest half, weights to the nearest gram.
fn round_amount(amount: f64, unit: &str) -> f64 {
  if unit == "adet" { (amount * 2.0).round() / 2.0 } else { amount.round() }
}

impl MealGenerator for PantryGenerator {
  type Error = Infallible;

  fn name(&self) -> &str { Self::NAME }

  async fn generate(&self, request: &GenerationRequest) -> Result<Vec<MealCandidate>, Infallible> {
    Ok(self.candidates(request))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn request(meal_types: Vec<MealType>, kcal: f64) -> GenerationRequest {
    GenerationRequest {
      envelope: Macros { kcal, protein_g: 40.0, carbs_g: 60.0, fat_g: 20.0 },
      meal_types,
      cuisine_tags: vec![],
      dietary_tags: vec![],
      avoid: vec![],
    }
  }

  #[test]
  fn menemen_nutrition_matches_table() {
    let menemen = [
      Ingredient { name: "yumurta".into(), amount: 2.0, unit: "adet".into() },
      Ingredient { name: "domates".into(), amount: 100.0, unit: "g".into() },
    ];
    // 100 g egg (155) + 100 g tomato (18)
    assert!((nutrition(&menemen).kcal - 173.0).abs() < 1e-9);
  }

  #[test]
  fn unknown_ingredients_contribute_nothing() {
    let odd = [Ingredient { name: "dragonfruit".into(), amount: 100.0, unit: "g".into() }];
    assert_eq!(nutrition(&odd), Macros::default());
  }

  #[test]
  fn candidates_hit_the_envelope_kcal() {
    let req = request(vec![MealType::Breakfast, MealType::Lunch, MealType::Dinner], 650.0);
    let meals = PantryGenerator::new().candidates(&req);
    assert_eq!(meals.len(), 3);
    for m in &meals {
      assert!((m.macros.kcal - 650.0).abs() < 1e-6, "{} has {}", m.name, m.macros.kcal);
    }
    assert_eq!(meals[0].meal_type, MealType::Breakfast);
    assert_eq!(meals[2].meal_type, MealType::Dinner);
  }

  #[test]
  fn vegetarian_tag_skips_meat() {
    let mut req = request(vec![MealType::Lunch, MealType::Dinner], 600.0);
    req.dietary_tags = vec!["vegetarian".into()];
    let meals = PantryGenerator::new().candidates(&req);
    assert_eq!(meals[0].name, "Chickpeas with Rice");
    assert_eq!(meals[1].name, "Red Lentil Stew");
  }

  #[test]
  fn avoided_names_are_skipped_and_repeats_avoided() {
    let mut req = request(vec![MealType::Snack, MealType::Snack], 200.0);
    req.avoid = vec!["almonds and walnuts".into()];
    let meals = PantryGenerator::new().candidates(&req);
    assert_eq!(meals[0].name, "Boiled Eggs with Tomato");
    // Only two snack templates exist; the second slot reuses the pool.
    assert_eq!(meals.len(), 2);
  }

  #[test]
  fn output_is_deterministic() {
    let req = request(MealType::for_day(4), 500.0);
    let g = PantryGenerator::new();
    assert_eq!(g.candidates(&req), g.candidates(&req));
  }
}
