//! Default catalog of TMJ exercises.
//!
//! Six exercises, always performed in order. The catalog is static
//! configuration and is never modified at runtime.

use crate::types::*;
use once_cell::sync::Lazy;

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog_internal);

/// Spoken when a session starts
pub const WELCOME_MESSAGE: &str = "Welcome to your TMJ exercise session. Remember: avoid jaw clicking during all exercises. Let's begin.";

/// Spoken once the last exercise is complete
pub const CLOSING_MESSAGE: &str = "Congratulations! You have completed your full TMJ exercise session. Remember to do this 6 times daily for at least 3 weeks.";

/// Spoken when a bilateral exercise moves to the right side
pub const SIDE_SWITCH_CUE: &str = "Now switching to the right side.";

pub const SESSION_SUMMARY: SessionSummary = SessionSummary {
    total_exercises: 6,
    estimated_duration: "1 minute",
    daily_frequency: 6,
    minimum_weeks: 3,
    general_safety_note: "Remember: No jaw clicking during any exercise. If clicking occurs, slow down and restart.",
};

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

/// Builds the default catalog
///
/// **Note**: For production use, prefer `get_default_catalog()` which returns a
/// cached reference. This function is retained for tests that need an owned copy.
pub fn build_default_catalog() -> Catalog {
    build_default_catalog_internal()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn build_default_catalog_internal() -> Catalog {
    let exercises = vec![
        Exercise {
            id: 1,
            name: "Deep Breathing with Tongue Position".into(),
            short_name: "Tongue-to-Roof Breathing".into(),
            description: "Hold tongue to roof of mouth with proper positioning while performing deep breathing".into(),
            instructions: strings(&[
                "Place tongue tip just behind the teeth",
                "Hold tongue firmly against the roof of the mouth",
                "Take six deep breaths while maintaining tongue position",
            ]),
            timing: Timing {
                repetitions: 6,
                hold_duration: None,
                is_breathing: true,
                has_sides: false,
            },
            safety_notes: strings(&[
                "Maintain tongue position throughout each breath cycle",
                "Breathe at natural rhythm between breaths",
            ]),
            audio_instructions: AudioInstructions {
                introduction: "Exercise 1: Deep Breathing with Tongue Position. This exercise helps establish proper tongue posture.".into(),
                preparation: "Place your tongue tip just behind your teeth, then hold your tongue firmly against the roof of your mouth.".into(),
                execution: "Take 6 deep breaths while maintaining tongue position. Breath number".into(),
                hold: None,
                completion: "Exercise 1 complete. Well done!".into(),
            },
        },
        Exercise {
            id: 2,
            name: "Wide Mouth Opening with Tongue Support".into(),
            short_name: "Tongue-Stabilized Jaw Opening".into(),
            description: "Open mouth widely while maintaining tongue position to prevent jaw clicking".into(),
            instructions: strings(&[
                "Hold tongue to the roof of your mouth",
                "Open mouth widely",
                "Ensure jaw does not click during movement",
                "Close mouth slowly",
            ]),
            timing: Timing {
                repetitions: 6,
                hold_duration: None,
                is_breathing: false,
                has_sides: false,
            },
            safety_notes: strings(&[
                "Jaw should not click - this indicates proper alignment",
                "Move slowly and with control",
                "Brief pause between repetitions",
            ]),
            audio_instructions: AudioInstructions {
                introduction: "Exercise 2: Wide Mouth Opening with Tongue Support. This prevents jaw clicking during movement.".into(),
                preparation: "Hold your tongue to the roof of your mouth throughout this exercise.".into(),
                execution: "Open your mouth widely, ensuring no clicking, then close slowly. Repetition".into(),
                hold: None,
                completion: "Exercise 2 complete. Remember - no clicking means proper alignment!".into(),
            },
        },
        Exercise {
            id: 3,
            name: "Finger-Guided Jaw Alignment".into(),
            short_name: "Bilateral Jaw Pressure Control".into(),
            description: "Use finger pressure on both sides to guide proper jaw alignment during opening".into(),
            instructions: strings(&[
                "Place one finger on each side of jaw",
                "Apply equal pressure to both sides",
                "Open jaw very slowly while maintaining pressure",
                "Do not allow jaw to click",
                "If jaw clicks, release and restart more slowly",
                "Close jaw with continued pressure guidance",
            ]),
            timing: Timing {
                repetitions: 6,
                hold_duration: None,
                is_breathing: false,
                has_sides: false,
            },
            safety_notes: strings(&[
                "Equal pressure ensures correct alignment",
                "Clicking indicates need to slow down",
                "Very slow and controlled movement",
            ]),
            audio_instructions: AudioInstructions {
                introduction: "Exercise 3: Finger-Guided Jaw Alignment. Equal pressure on both sides ensures proper alignment.".into(),
                preparation: "Place one finger on each side of your jaw. Apply equal pressure to both sides.".into(),
                execution: "Open your jaw very slowly while maintaining equal pressure. No clicking allowed. Repetition".into(),
                hold: None,
                completion: "Exercise 3 complete. Equal pressure is key to proper alignment!".into(),
            },
        },
        Exercise {
            id: 4,
            name: "Fist-Resistance Jaw Opening".into(),
            short_name: "Chin Resistance Exercise".into(),
            description: "Create resistance with fist under chin while opening jaw".into(),
            instructions: strings(&[
                "Make a fist",
                "Place fist directly under chin",
                "Balance the weight of fist against chin",
                "Gently try to open jaw against resistance",
                "Avoid allowing jaw to click",
                "Hold position",
                "Release and return to starting position",
            ]),
            timing: Timing {
                repetitions: 6,
                hold_duration: Some(6),
                is_breathing: false,
                has_sides: false,
            },
            safety_notes: strings(&[
                "Try not to allow jaw to click during exercise",
                "Brief pause between repetitions",
            ]),
            audio_instructions: AudioInstructions {
                introduction: "Exercise 4: Fist-Resistance Jaw Opening. This strengthens your jaw muscles with controlled resistance.".into(),
                preparation: "Make a fist and place it directly under your chin. Balance the weight against your chin.".into(),
                execution: "Gently try to open your jaw against the resistance. Hold for 6 seconds. Repetition".into(),
                hold: Some("Hold this position. Avoid clicking.".into()),
                completion: "Exercise 4 complete. Great work building jaw strength!".into(),
            },
        },
        Exercise {
            id: 5,
            name: "Side Jaw Pressure Exercise".into(),
            short_name: "Lateral Jaw Resistance".into(),
            description: "Apply steady pressure to side of jaw below the hinge".into(),
            instructions: strings(&[
                "Press fist against left side of jaw below the hinge",
                "Maintain steady, consistent pressure",
                "Hold position",
                "Release",
                "Repeat on opposite (right) side of jaw",
            ]),
            timing: Timing {
                repetitions: 6,
                hold_duration: Some(6),
                is_breathing: false,
                has_sides: true,
            },
            safety_notes: strings(&[
                "Complete all repetitions on left side, then switch to right side",
                "Brief pause between repetitions and sides",
            ]),
            audio_instructions: AudioInstructions {
                introduction: "Exercise 5: Side Jaw Pressure Exercise. This works both left and right sides of your jaw.".into(),
                preparation: "We'll start with the left side. Press your fist against the left side of your jaw below the hinge.".into(),
                // The side is announced separately for bilateral exercises
                execution: "Maintain steady pressure and hold for 6 seconds. Repetition".into(),
                hold: Some("Hold steady pressure.".into()),
                completion: "Exercise 5 complete. Both sides strengthened!".into(),
            },
        },
        Exercise {
            id: 6,
            name: "Chin Retraction Exercise".into(),
            short_name: "Double Chin Neck Stretch".into(),
            description: "Create double chin position to stretch neck muscles".into(),
            instructions: strings(&[
                "Place one finger on chin",
                "Move chin backward as if making a double chin",
                "Feel tightness at the back of neck (this is normal and desired)",
                "Hold position",
                "Release and return to neutral position",
            ]),
            timing: Timing {
                repetitions: 6,
                hold_duration: Some(6),
                is_breathing: false,
                has_sides: false,
            },
            safety_notes: strings(&[
                "Tightness at back of neck indicates proper execution",
                "Brief pause between repetitions",
            ]),
            audio_instructions: AudioInstructions {
                introduction: "Exercise 6: Chin Retraction Exercise. This final exercise stretches your neck muscles.".into(),
                preparation: "Place one finger on your chin.".into(),
                execution: "Move your chin backward creating a double chin. Feel the tightness at the back of your neck. Repetition".into(),
                hold: Some("Hold this double chin position. The tightness you feel is normal and desired.".into()),
                completion: "Exercise 6 complete. Excellent work! You've completed your full TMJ exercise session.".into(),
            },
        },
    ];

    Catalog::new(exercises)
}

impl Catalog {
    /// Validate the catalog for consistency
    ///
    /// Returns a list of validation errors (empty if valid)
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.exercises.is_empty() {
            errors.push("Catalog has no exercises".to_string());
        }

        for (index, ex) in self.exercises.iter().enumerate() {
            let expected_id = index as u32 + 1;
            if ex.id != expected_id {
                errors.push(format!(
                    "Exercise at position {} has id {}, expected {}",
                    index, ex.id, expected_id
                ));
            }

            if ex.timing.repetitions == 0 {
                errors.push(format!("Exercise {} has zero repetitions", ex.id));
            }

            if ex.timing.hold_duration == Some(0) {
                errors.push(format!("Exercise {} has a zero-second hold", ex.id));
            }

            if ex.timing.is_breathing && ex.timing.hold_duration.is_some() {
                errors.push(format!(
                    "Exercise {} is both a breathing and a hold exercise",
                    ex.id
                ));
            }

            let is_hold = matches!(ex.timing.pattern(), TimingPattern::Hold(_));
            if ex.timing.has_sides && !is_hold {
                errors.push(format!(
                    "Exercise {}: sides are only supported on hold exercises",
                    ex.id
                ));
            }

            if ex.audio_instructions.hold.is_some() && !is_hold {
                errors.push(format!(
                    "Exercise {} has hold narration but no hold duration",
                    ex.id
                ));
            }

            let audio = &ex.audio_instructions;
            let texts = [
                ("introduction", &audio.introduction),
                ("preparation", &audio.preparation),
                ("execution", &audio.execution),
                ("completion", &audio.completion),
            ];
            for (phase, text) in texts {
                if text.trim().is_empty() {
                    errors.push(format!("Exercise {} has empty {} narration", ex.id, phase));
                }
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads() {
        let catalog = build_default_catalog();
        assert_eq!(catalog.len(), 6);
        assert_eq!(catalog.len(), SESSION_SUMMARY.total_exercises);
    }

    #[test]
    fn test_default_catalog_validates() {
        let catalog = build_default_catalog();
        let errors = catalog.validate();
        assert!(
            errors.is_empty(),
            "Default catalog has validation errors: {:?}",
            errors
        );
    }

    #[test]
    fn test_ids_are_in_sequence() {
        let ids: Vec<u32> = get_default_catalog().exercises.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_one_bilateral_hold_exercise() {
        let bilateral: Vec<_> = get_default_catalog()
            .exercises
            .iter()
            .filter(|e| e.timing.has_sides)
            .collect();
        assert_eq!(bilateral.len(), 1);
        assert_eq!(bilateral[0].timing.pattern(), TimingPattern::Hold(6));
    }

    #[test]
    fn test_first_exercise_is_breathing() {
        let first = get_default_catalog().find(1).unwrap();
        assert_eq!(first.timing.pattern(), TimingPattern::Breathing);
        assert_eq!(first.timing.repetitions, 6);
    }

    #[test]
    fn test_validate_rejects_bad_timing() {
        let mut catalog = build_default_catalog();
        catalog.exercises[0].timing.hold_duration = Some(4);
        catalog.exercises[1].timing.repetitions = 0;
        catalog.exercises[2].timing.has_sides = true;

        let errors = catalog.validate();
        assert!(errors.iter().any(|e| e.contains("both a breathing and a hold")));
        assert!(errors.iter().any(|e| e.contains("zero repetitions")));
        assert!(errors.iter().any(|e| e.contains("sides are only supported")));
    }

    #[test]
    fn test_validate_rejects_out_of_order_ids() {
        let mut catalog = build_default_catalog();
        catalog.exercises.swap(0, 1);

        let errors = catalog.validate();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_empty_catalog_is_invalid() {
        let errors = Catalog::new(vec![]).validate();
        assert_eq!(errors, vec!["Catalog has no exercises".to_string()]);
    }
}
