use bte_runtime::{BbKey, Blackboard, StepError};

const SPEED: BbKey<f32> = BbKey::new("speed");
const SPEED_AS_INT: BbKey<i64> = BbKey::new("speed");

#[test]
fn values_are_typed_by_key() {
    let mut bb = Blackboard::new();
    bb.set(SPEED, 1.5);

    assert_eq!(bb.get(SPEED), Some(&1.5));
    assert_eq!(bb.get(SPEED_AS_INT), None);
    assert_eq!(
        bb.try_get(SPEED_AS_INT),
        Err(StepError::BlackboardType { key: "speed" })
    );
}

#[test]
fn removing_with_the_wrong_type_keeps_the_entry() {
    let mut bb = Blackboard::new();
    bb.set(SPEED, 2.0);

    assert_eq!(bb.remove(SPEED_AS_INT), None);
    assert!(bb.contains(SPEED));
    assert_eq!(bb.remove(SPEED), Some(2.0));
    assert!(bb.is_empty());
}
