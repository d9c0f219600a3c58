use std::fs::File;

use rand::Rng;

use crate::domain::{ProductId, ProductSnapshot, UserId};

/// Fixed demo catalog: a handful of creators, two products each. The
/// generator below only references these ids.
pub fn demo_products() -> Vec<ProductSnapshot> {
    let entries = [
        ("prod-1", "creator-1", "Forearm script", "arm"),
        ("prod-2", "creator-1", "Ankle band", "leg"),
        ("prod-3", "creator-2", "Shoulder crest", "shoulder"),
        ("prod-4", "creator-2", "Collarbone quote", "chest"),
        ("prod-5", "creator-3", "Nape initials", "neck"),
        ("prod-6", "creator-3", "Wrist date", "arm"),
    ];

    entries
        .iter()
        .map(|(product, creator, name, body_part)| ProductSnapshot {
            product_id: ProductId::new(*product),
            creator_id: UserId::new(*creator),
            name: (*name).to_string(),
            main_photo_url: format!("https://cdn.example.com/{}.jpg", product),
            body_part: (*body_part).to_string(),
        })
        .collect()
}

const HEADER: [&str; 11] = [
    "type",
    "request",
    "user",
    "product",
    "deadline",
    "instruction",
    "image",
    "body_part_ok",
    "text_ok",
    "override",
    "amount",
];

fn row(
    action: &str,
    request: &str,
    user: &str,
    product: &str,
    deadline: &str,
    instruction: &str,
    image: &str,
    body_part_ok: &str,
    text_ok: &str,
    manual_override: &str,
    amount: &str,
) -> Vec<String> {
    [
        action,
        request,
        user,
        product,
        deadline,
        instruction,
        image,
        body_part_ok,
        text_ok,
        manual_override,
        amount,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Generate a mock workload CSV of `count` commission requests. Deposits come
/// first so every accept can be funded; lifecycle rows for different requests
/// are interleaved while each request's own rows stay in order, which is what
/// exercises the per-request serialization.
pub fn generator(output: &str, count: usize) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::create(output)?;
    let mut wtr = csv::Writer::from_writer(file);
    wtr.write_record(HEADER)?;

    let products = demo_products();
    let num_requesters = (count / 5).clamp(4, 200);
    let mut rng = rand::rng();

    for requester in 1..=num_requesters {
        let amount = 40 + rng.random_range(0..40);
        wtr.write_record(row(
            "deposit",
            "",
            &format!("user-{}", requester),
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            &amount.to_string(),
        ))?;
    }

    let deadlines = ["3d", "48h", "24h"];
    let mut queues: Vec<Vec<Vec<String>>> = Vec::new();

    for i in 1..=count {
        let request = format!("req-{}", i);
        let requester = format!("user-{}", rng.random_range(1..=num_requesters));
        let product = &products[rng.random_range(0..products.len())];
        let product_id = product.product_id.as_str();
        let creator = product.creator_id.as_str();
        let deadline = deadlines[rng.random_range(0..deadlines.len())];
        let instruction = format!("piece {}", i);
        let image = format!("https://uploads.example.com/{}.jpg", request);

        let mut queue = vec![row(
            "create", &request, &requester, product_id, deadline, &instruction, "", "", "", "", "",
        )];

        match rng.random_range(0..10) {
            // Withdrawn before anyone accepts
            0 | 1 => queue.push(row(
                "cancel", &request, &requester, "", "", "", "", "", "", "", "",
            )),
            // Left pending
            2 => {}
            // Full flow through delivery and a validation verdict
            _ => {
                queue.push(row(
                    "accept", &request, creator, "", "", "", "", "", "", "", "",
                ));
                queue.push(row(
                    "deliver", &request, creator, "", "", "", &image, "", "", "", "",
                ));
                let (body_part_ok, text_ok, manual) = match rng.random_range(0..10) {
                    0 | 1 => ("true", "false", ""),
                    2 => ("", "", "true"),
                    _ => ("true", "true", ""),
                };
                queue.push(row(
                    "validate",
                    &request,
                    "",
                    "",
                    "",
                    "",
                    "",
                    body_part_ok,
                    text_ok,
                    manual,
                    "",
                ));
            }
        }

        queues.push(queue);
    }

    // Interleave across requests, preserving per-request order
    while !queues.is_empty() {
        let idx = rng.random_range(0..queues.len());
        let next = queues[idx].remove(0);
        wtr.write_record(&next)?;
        if queues[idx].is_empty() {
            queues.swap_remove(idx);
        }
    }

    wtr.flush()?;
    println!(
        "✓ Generated {} requests across {} requesters to {} (interleaved for concurrency testing)",
        count, num_requesters, output
    );
    Ok(())
}
