//! Default catalog of exercises.
//!
//! This module provides the built-in exercises a practice session draws from.

use crate::types::*;
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Cached default catalog - built once and reused across all sessions
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog_internal);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

/// Builds the default catalog
///
/// **Note**: For production use, prefer `get_default_catalog()` which returns a
/// cached reference. This function is retained for testing.
pub fn build_default_catalog() -> Catalog {
    build_default_catalog_internal()
}

fn build_default_catalog_internal() -> Catalog {
    let exercises = vec![
        ExerciseRecord::new(
            "Cat-Cow Pose",
            "On hands and knees, alternate arching (cow) and rounding (cat) your spine.",
        ),
        ExerciseRecord::new(
            "High-Stepping/Marching in Place",
            "Lift knees high towards your chest with each step.",
        ),
        ExerciseRecord::new(
            "Leg Swings (Forward and Back)",
            "Stand on one leg, gently swing the other leg forward and backward. Use support if needed. Switch legs.",
        ),
        ExerciseRecord::new(
            "Bird Dog",
            "On hands and knees, extend your opposite arm straight forward and opposite leg straight back, keeping your core engaged and back flat. Alternate sides.",
        ),
        ExerciseRecord::new(
            "Plank",
            "Hold a straight line from head to heels, on forearms or hands. Engage your core.",
        ),
        ExerciseRecord::new(
            "Glute Bridges",
            "Lie on your back, knees bent, feet flat. Lift your hips off the floor, squeezing glutes.",
        ),
        ExerciseRecord::new(
            "Wall Push-Ups",
            "Stand facing a wall, place hands on the wall. Lean towards the wall by bending elbows, keeping body straight, then push back.",
        ),
        ExerciseRecord::new(
            "Mini Squats (or Chair Squats)",
            "Lower hips slightly as if about to sit (mini squat), or fully stand up from a chair and sit back down.",
        ),
        ExerciseRecord::new(
            "Lunges (Stationary or Alternating)",
            "Step one foot forward, lower hips until both knees are bent at about 90 degrees. Keep front knee over ankle. Alternate legs.",
        ),
        ExerciseRecord::new(
            "Heel Raises",
            "Stand, slowly rise onto the balls of your feet, lifting heels high, then slowly lower.",
        ),
        ExerciseRecord::new(
            "Low-Impact Jumping Jacks (Modified)",
            "Step one leg out to the side while raising arms overhead; return. Repeat on the other side (no jump).",
        ),
        ExerciseRecord::new(
            "Standing Oblique Crunches",
            "Stand with feet hip-width apart, hands gently behind head. Crunch to one side, bringing elbow towards hip. Alternate sides.",
        ),
        ExerciseRecord::new(
            "Single Leg Balance",
            "Stand on one leg, trying to maintain balance. Switch legs after 15 seconds or hold for the full 30 if comfortable. Use support if needed.",
        ),
        ExerciseRecord::new(
            "Fire Hydrants",
            "On hands and knees, keep one knee bent at 90 degrees and lift it out to the side, hip height. Lower and repeat. Switch sides.",
        ),
        ExerciseRecord::new(
            "Seesaw Forearm Plank",
            "In a forearm plank, gently rock your body forward (nose over fingertips) and backward.",
        ),
        ExerciseRecord::new(
            "Tabletop Oblique Crunch",
            "From hands and knees, extend one leg back. Then, bring that knee towards the opposite elbow, crunching your side. Extend back. Switch sides.",
        ),
        ExerciseRecord::new(
            "Windshield Wipers (Seated or Lying)",
            "Seated: Sit with knees bent, feet flat. Lean back slightly on hands. Gently sway knees from side to side. Lying: Lie on back, knees bent, feet flat. Let knees fall to one side, then the other.",
        ),
        ExerciseRecord::new(
            "Modified Side Plank Reach",
            "Start in a modified side plank (on your knee and forearm). Reach your top arm underneath your body, then open it up towards the ceiling. Switch sides.",
        ),
        ExerciseRecord::new(
            "Dead Bug",
            "Lie on your back with arms extended towards the ceiling and knees bent at 90 degrees (shins parallel to floor). Slowly lower your opposite arm and leg towards the floor, keeping your lower back pressed into the mat. Return to start and alternate.",
        ),
        ExerciseRecord::new(
            "Wall Sit",
            "Lean against a wall and slide down until your knees are at a 90-degree angle, as if sitting in a chair. Hold.",
        ),
        ExerciseRecord::new(
            "Step-Ups",
            "Step up with one foot, then the other. Step down. Alternate lead foot. If no step, mimic the motion.",
        ),
        ExerciseRecord::new(
            "Superman",
            "Lie on your stomach with arms and legs extended. Simultaneously lift your arms, chest, and legs off the floor, keeping your neck in line with your spine. Hold briefly and lower.",
        ),
    ];

    Catalog { exercises }
}

impl Catalog {
    /// Number of exercises in the catalog
    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    /// Validate the catalog for consistency and completeness
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.exercises.is_empty() {
            errors.push("Catalog has no exercises".to_string());
        }

        let mut seen = HashSet::new();
        for (position, exercise) in self.exercises.iter().enumerate() {
            if exercise.name.trim().is_empty() {
                errors.push(format!("Exercise #{} has empty name", position + 1));
            }
            if exercise.description.trim().is_empty() {
                errors.push(format!(
                    "Exercise '{}' has empty description",
                    exercise.name
                ));
            }
            if !seen.insert(exercise.name.as_str()) {
                errors.push(format!("Duplicate exercise name '{}'", exercise.name));
            }
        }

        errors
    }
}
