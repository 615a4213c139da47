use crate::{body::BodyHandle, contact::CollisionInfo};
use std::collections::BTreeMap;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PhysicsEvent {
    /// A solid contact seen this step, including contacts with voxels.
    Collision(CollisionInfo),
    TriggerEnter { a: BodyHandle, b: BodyHandle },
    TriggerExit { a: BodyHandle, b: BodyHandle },
}

/// Per body callbacks. Called after the step completes, never from inside it.
pub trait BodyListener {
    fn on_collision(&mut self, _body: BodyHandle, _info: &CollisionInfo) {}
    fn on_trigger_enter(&mut self, _body: BodyHandle, _other: BodyHandle) {}
    fn on_trigger_exit(&mut self, _body: BodyHandle, _other: BodyHandle) {}
}

/// Sees every event in the world.
pub trait WorldListener {
    fn on_collision(&mut self, _info: &CollisionInfo) {}
    fn on_trigger_enter(&mut self, _a: BodyHandle, _b: BodyHandle) {}
    fn on_trigger_exit(&mut self, _a: BodyHandle, _b: BodyHandle) {}
}

#[derive(Default)]
pub(crate) struct Listeners {
    pub(crate) bodies: BTreeMap<BodyHandle, Box<dyn BodyListener>>,
    pub(crate) world: Option<Box<dyn WorldListener>>,
}

impl Listeners {
    pub(crate) fn dispatch(&mut self, events: &[PhysicsEvent]) {
        for event in events {
            match *event {
                PhysicsEvent::Collision(ref info) => {
                    if let Some(listener) = self.bodies.get_mut(&info.body_a) {
                        listener.on_collision(info.body_a, info);
                    }
                    if let Some(body_b) = info.body_b {
                        if let Some(listener) = self.bodies.get_mut(&body_b) {
                            listener.on_collision(body_b, info);
                        }
                    }
                    if let Some(listener) = self.world.as_mut() {
                        listener.on_collision(info);
                    }
                }
                PhysicsEvent::TriggerEnter { a, b } => {
                    if let Some(listener) = self.bodies.get_mut(&a) {
                        listener.on_trigger_enter(a, b);
                    }
                    if let Some(listener) = self.bodies.get_mut(&b) {
                        listener.on_trigger_enter(b, a);
                    }
                    if let Some(listener) = self.world.as_mut() {
                        listener.on_trigger_enter(a, b);
                    }
                }
                PhysicsEvent::TriggerExit { a, b } => {
                    if let Some(listener) = self.bodies.get_mut(&a) {
                        listener.on_trigger_exit(a, b);
                    }
                    if let Some(listener) = self.bodies.get_mut(&b) {
                        listener.on_trigger_exit(b, a);
                    }
                    if let Some(listener) = self.world.as_mut() {
                        listener.on_trigger_exit(a, b);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{arena::Arena, body::Body};
    use std::{cell::RefCell, rc::Rc};

    #[derive(Default)]
    struct Log(Rc<RefCell<Vec<String>>>);

    impl BodyListener for Log {
        fn on_trigger_enter(&mut self, body: BodyHandle, other: BodyHandle) {
            self.0
                .borrow_mut()
                .push(format!("enter {} {}", body.index(), other.index()));
        }
    }

    impl WorldListener for Log {
        fn on_trigger_exit(&mut self, a: BodyHandle, b: BodyHandle) {
            self.0
                .borrow_mut()
                .push(format!("world exit {} {}", a.index(), b.index()));
        }
    }

    #[test]
    fn test_dispatch_to_both_bodies_and_world() {
        let mut arena = Arena::new();
        let a = arena.insert(Body::default());
        let b = arena.insert(Body::default());
        let log = Rc::new(RefCell::new(Vec::new()));

        let mut listeners = Listeners::default();
        listeners.bodies.insert(a, Box::new(Log(log.clone())));
        listeners.bodies.insert(b, Box::new(Log(log.clone())));
        listeners.world = Some(Box::new(Log(log.clone())));

        listeners.dispatch(&[
            PhysicsEvent::TriggerEnter { a, b },
            PhysicsEvent::TriggerExit { a, b },
        ]);
        assert_eq!(
            *log.borrow(),
            vec!["enter 0 1", "enter 1 0", "world exit 0 1"]
        );
    }
}
