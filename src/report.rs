use std::fmt::Write;

use loadpath::{ContributorLoads, GraphDocument, LoadContributors, Vec3};
use uom::si::{force::newton, mass::kilogram, torque::newton_meter};

/// Format a vector as `(x, y, z)` with a fixed precision.
fn triple(v: Vec3) -> String {
    format!("({:.2}, {:.2}, {:.2})", v.x, v.y, v.z)
}

/// Render the node property table followed by the connection list.
#[must_use]
pub fn render_document(document: &GraphDocument) -> String {
    let mut output = String::new();

    if document.nodes.is_empty() {
        output.push_str("No nodes yet\n");
    } else {
        writeln!(
            &mut output,
            "{:<12} {:>9}  {:<24} {:<24} {:<24} {:<24} {:<5} {:<24} {:>8} {:>8}",
            "ID", "Mass (kg)", "CoG", "Force", "Moment", "Euler (deg)", "Order", "Translation",
            "X", "Y"
        )
        .expect("writing to string cannot fail");
        for node in &document.nodes {
            let data = &node.data;
            writeln!(
                &mut output,
                "{:<12} {:>9.3}  {:<24} {:<24} {:<24} {:<24} {:<5} {:<24} {:>8.1} {:>8.1}",
                data.id,
                data.mass,
                triple(data.cog),
                triple(data.external_force),
                triple(data.moment),
                triple(data.euler_angles),
                data.rotation_order,
                triple(data.translation),
                node.position.x,
                node.position.y
            )
            .expect("writing to string cannot fail");
        }
    }

    output.push('\n');
    let mut connections = document.valid_edges().peekable();
    if connections.peek().is_none() {
        output.push_str("No connections yet\n");
    } else {
        output.push_str("Connections:\n");
        for edge in connections {
            writeln!(
                &mut output,
                "  {:<6} {} -> {}",
                edge.id(),
                edge.source(),
                edge.target()
            )
            .expect("writing to string cannot fail");
        }
    }

    output
}

/// Render the result of a load-contributor trace.
#[must_use]
pub fn render_trace(report: &LoadContributors, loads: &ContributorLoads) -> String {
    let mut output = String::new();

    writeln!(&mut output, "Selected connection: {}", report.selected_edge)
        .expect("writing to string cannot fail");

    match (&report.grounded_node, report.is_grounding_ambiguous()) {
        (Some(node), false) => writeln!(&mut output, "Grounded node: {node}"),
        (Some(node), true) => writeln!(
            &mut output,
            "Grounded node: {node} (ambiguous; candidates: {})",
            report.grounded_candidates.join(", ")
        ),
        (None, _) => writeln!(
            &mut output,
            "Grounded node: none (every node has an outgoing connection)"
        ),
    }
    .expect("writing to string cannot fail");

    writeln!(
        &mut output,
        "Contributors ({}): {}",
        report.contributors.len(),
        report.contributors.join(", ")
    )
    .expect("writing to string cannot fail");

    let force = loads.total_force.map(|f| f.get::<newton>());
    let moment = loads.total_moment.map(|m| m.get::<newton_meter>());
    writeln!(
        &mut output,
        "Contributor totals: mass = {:.3} kg, force = {} N, moment = {} N*m",
        loads.total_mass.get::<kilogram>(),
        triple(Vec3::from(force)),
        triple(Vec3::from(moment))
    )
    .expect("writing to string cannot fail");

    output
}
