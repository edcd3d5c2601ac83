//! Spoken prompts for each transition.

pub const WARM_UP: &str =
    "Warm up time. Perform slow stretching and easy movements from head to feet.";

pub const WARM_UP_COMPLETE: &str = "Warm-up complete. Ready for your first exercise.";

pub const EXERCISE_COMPLETE: &str = "Exercise complete. Ready for next exercise.";

pub const COOL_DOWN: &str =
    "All exercises complete. Cool down time. Stay in child pose and take deep abdominal breaths.";

pub const PRACTICE_COMPLETE: &str =
    "Congratulations! Your practice is complete. Your body and mind thank you.";

/// On-screen hint shown under the warm-up clock
pub const WARM_UP_HINT: &str = "Slow stretching and easy movements from head to feet.";

/// On-screen hint shown under the cool-down clock
pub const COOL_DOWN_HINT: &str = "Stay in child pose and take deep abdominal breaths.";
