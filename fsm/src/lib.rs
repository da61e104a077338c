//! # GENERIC STATE-MACHINE DRIVER
//!
//! A tiny, reusable core for the state machines the GEM layer needs: the
//! communication-state machine ([SEMI E30]§5.2.3) and the control-state
//! machine ([SEMI E30]§5.3). Rather than a runtime textual event/callback
//! table, each machine is a concrete type implementing [Transition] as an
//! exhaustive match over `(state, event)`; [Machine] just owns the current
//! state and applies transitions through it.
//!
//! [SEMI E30]: https://store-us.semi.org/products/e03000-semi-e30-specification-for-the-generic-model-for-communications-and-control-of-manufacturing-equipment-gem

use std::fmt::Debug;

/// ## TRANSITION RULE
///
/// Implemented once per concrete state machine. `apply` is given the
/// current state and an incoming event, and either produces the next
/// state plus whatever the machine wants to emit on this transition, or
/// reports the event as illegal in that state.
pub trait Transition {
  type State: Clone + PartialEq + Debug;
  type Event: Debug;
  /// Emitted on every successful transition — typically a small enum of
  /// side effects the caller must carry out (send a message, invoke a
  /// delegate callback), never executed by the machine itself.
  type Output;

  /// Attempt the transition. Returning `Err` leaves the machine's state
  /// unchanged in [Machine::fire].
  fn apply(&self, state: &Self::State, event: Self::Event) -> Result<(Self::State, Self::Output), IllegalTransition<Self::State, Self::Event>>;
}

/// An event arrived that the current state has no defined transition for.
#[derive(Debug)]
pub struct IllegalTransition<S, E> {
  pub state: S,
  pub event: E,
}
impl<S: Debug, E: Debug> std::fmt::Display for IllegalTransition<S, E> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "no transition for {:?} in state {:?}", self.event, self.state)
  }
}
impl<S: Debug, E: Debug> std::error::Error for IllegalTransition<S, E> {}

/// ## MACHINE
///
/// Owns the current state of a [Transition] implementation and serializes
/// access to it — callers drive the machine purely through [Machine::fire].
#[derive(Debug)]
pub struct Machine<T: Transition> {
  transition: T,
  state: T::State,
}
impl<T: Transition> Machine<T> {
  pub fn new(transition: T, initial: T::State) -> Self {
    Machine { transition, state: initial }
  }

  pub fn state(&self) -> &T::State {
    &self.state
  }

  /// Apply `event` to the current state. On success, the machine's state
  /// advances and the transition's `Output` is returned; on failure the
  /// state is left untouched.
  pub fn fire(&mut self, event: T::Event) -> Result<T::Output, IllegalTransition<T::State, T::Event>> {
    let (next, output) = self.transition.apply(&self.state, event)?;
    self.state = next;
    Ok(output)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Clone, Copy, Debug, PartialEq)]
  enum Light {
    Red,
    Green,
    Yellow,
  }

  #[derive(Debug)]
  struct Tick;

  struct TrafficLight;
  impl Transition for TrafficLight {
    type State = Light;
    type Event = Tick;
    type Output = ();

    fn apply(&self, state: &Light, _event: Tick) -> Result<(Light, ()), IllegalTransition<Light, Tick>> {
      let next = match state {
        Light::Red => Light::Green,
        Light::Green => Light::Yellow,
        Light::Yellow => Light::Red,
      };
      Ok((next, ()))
    }
  }

  #[test]
  fn cycles_through_states() {
    let mut machine = Machine::new(TrafficLight, Light::Red);
    machine.fire(Tick).unwrap();
    assert_eq!(*machine.state(), Light::Green);
    machine.fire(Tick).unwrap();
    assert_eq!(*machine.state(), Light::Yellow);
    machine.fire(Tick).unwrap();
    assert_eq!(*machine.state(), Light::Red);
  }

  #[derive(Clone, Copy, Debug, PartialEq)]
  enum Door {
    Open,
    Closed,
  }

  #[derive(Debug)]
  enum DoorEvent {
    Open,
    Close,
  }

  struct DoorLock;
  impl Transition for DoorLock {
    type State = Door;
    type Event = DoorEvent;
    type Output = ();

    fn apply(&self, state: &Door, event: DoorEvent) -> Result<(Door, ()), IllegalTransition<Door, DoorEvent>> {
      match (state, &event) {
        (Door::Closed, DoorEvent::Open) => Ok((Door::Open, ())),
        (Door::Open, DoorEvent::Close) => Ok((Door::Closed, ())),
        _ => Err(IllegalTransition { state: *state, event }),
      }
    }
  }

  #[test]
  fn rejects_illegal_transition() {
    let mut machine = Machine::new(DoorLock, Door::Closed);
    let err = machine.fire(DoorEvent::Close).unwrap_err();
    assert_eq!(err.state, Door::Closed);
    assert_eq!(*machine.state(), Door::Closed);
  }
}
