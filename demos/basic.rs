//! A small increment pipeline being drained by the execution loop.

use petriflow::{
    ExecOptions, Inflow, NetNode, Outflow, PetriNet, Place, Signature, Token, Transition,
    TypeDescriptor,
};

// (In) -> |Inc| -> (Out)
fn build_net() -> Result<PetriNet, Box<dyn std::error::Error>> {
    let net = PetriNet::from_nodes(vec![
        NetNode::Place(Place::with_tokens(
            "In",
            TypeDescriptor::Int,
            vec![Token::Int(1), Token::Int(2), Token::Int(3)],
        )?),
        NetNode::Trans(Transition::new(
            "Inc",
            Signature::new([("x", TypeDescriptor::Int)], TypeDescriptor::Int),
            |kwargs| Ok(Token::Int(kwargs["x"].as_int().unwrap_or(0) + 1)),
        )),
        NetNode::Inflow(Inflow::new("In", "Inc", "x")),
        NetNode::Outflow(Outflow::new("Inc", "Out")),
        NetNode::Place(Place::new("Out", TypeDescriptor::Int)),
    ])?;
    Ok(net)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut net = build_net()?;
    let fired = futures::executor::block_on(net.execute(ExecOptions::new(10)))?;
    println!("fired {fired} transitions");
    for place in net.places() {
        println!("{}: {:?}", place.name(), place.tokens());
    }
    Ok(())
}
